use crate::models::{JobId, JobPosting};
use std::collections::BTreeSet;

/// Read-only catalog of job postings, built once at startup
#[derive(Debug, Clone)]
pub struct JobCatalog {
    jobs: Vec<JobPosting>,
}

impl JobCatalog {
    pub fn new(mut jobs: Vec<JobPosting>) -> Self {
        jobs.sort_by_key(|j| j.id);
        jobs.dedup_by_key(|j| j.id);
        Self { jobs }
    }

    pub fn all(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn get(&self, id: JobId) -> Option<&JobPosting> {
        self.jobs
            .binary_search_by_key(&id, |j| j.id)
            .ok()
            .map(|idx| &self.jobs[idx])
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.get(id).is_some()
    }

    /// Postings for the ids in `ids`, skipping ids not in the catalog
    pub fn select(&self, ids: &BTreeSet<JobId>) -> Vec<JobPosting> {
        self.jobs
            .iter()
            .filter(|j| ids.contains(&j.id))
            .cloned()
            .collect()
    }
}

impl Default for JobCatalog {
    fn default() -> Self {
        Self::new(default_postings())
    }
}

#[allow(clippy::too_many_arguments)]
fn posting(
    id: JobId,
    title: &str,
    company: &str,
    location: &str,
    job_type: &str,
    skills: &[&str],
    description: &str,
    rating: f32,
    review_count: u32,
) -> JobPosting {
    JobPosting {
        id,
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        job_type: job_type.to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        description: description.to_string(),
        rating,
        review_count,
    }
}

fn default_postings() -> Vec<JobPosting> {
    vec![
        posting(
            1,
            "Frontend Developer Intern",
            "TechForward Inc.",
            "San Francisco, CA",
            "Part-Time",
            &["React", "TypeScript", "CSS"],
            "Join our dynamic team to build beautiful and responsive user interfaces for our flagship product. You will work closely with designers and backend engineers.",
            4.8,
            22,
        ),
        posting(
            2,
            "Data Analyst Intern",
            "DataWise Analytics",
            "New York, NY",
            "Flexible",
            &["Python", "SQL", "Tableau"],
            "Help us make sense of large datasets to drive business decisions. This role involves data cleaning, analysis, and visualization. A great opportunity to learn from seasoned data scientists.",
            4.5,
            15,
        ),
        posting(
            3,
            "UX/UI Design Intern",
            "Creative Minds Studio",
            "Austin, TX (Remote)",
            "Freelance",
            &["Figma", "Sketch", "User Research"],
            "We are looking for a creative UX/UI intern to help design the next generation of our mobile app. You will be involved in the entire design process, from user research to final mockups.",
            4.9,
            31,
        ),
        posting(
            4,
            "Social Media Marketing Intern",
            "Connect Social",
            "Los Angeles, CA",
            "Part-Time",
            &["Content Creation", "SEO", "Analytics"],
            "Manage our social media channels, create engaging content, and analyze campaign performance. If you are passionate about digital marketing, this is the role for you.",
            4.6,
            18,
        ),
        posting(
            5,
            "Backend Developer Intern",
            "ServerStrong",
            "Boston, MA",
            "Full-Time",
            &["Node.js", "Express", "MongoDB"],
            "Work on the core infrastructure of our platform. You will be responsible for designing and implementing RESTful APIs, managing databases, and ensuring scalability.",
            4.7,
            25,
        ),
        posting(
            6,
            "Junior Project Manager",
            "BuildIt Right",
            "Chicago, IL",
            "Flexible",
            &["Agile", "Scrum", "Communication"],
            "Assist our project managers in planning and executing projects. This is a great entry-level role for someone organized and with strong communication skills.",
            4.4,
            12,
        ),
    ]
}
