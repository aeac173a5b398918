use wasm_bindgen::prelude::*;
use web_sys::Document;

use crate::constants::{QUEUE_LIST_ID, QUEUE_VISIBLE_JOBS};
use crate::models::Job;

pub const EMPTY_TITLE: &str = "No jobs queued";
pub const EMPTY_HINT: &str = "Use \"Queue Prompt\" to submit";

/// `(title, meta)` pairs for the queue cards, oldest of the visible jobs
/// first.
pub fn queue_rows(jobs: &[Job]) -> Vec<(String, String)> {
    if jobs.is_empty() {
        return vec![(EMPTY_TITLE.to_string(), EMPTY_HINT.to_string())];
    }
    let start = jobs.len().saturating_sub(QUEUE_VISIBLE_JOBS);
    jobs[start..]
        .iter()
        .map(|job| (job.title.clone(), job.status.to_string()))
        .collect()
}

pub fn render(document: &Document, jobs: &[Job]) -> Result<(), JsValue> {
    let Some(list) = document.get_element_by_id(QUEUE_LIST_ID) else {
        return Ok(());
    };
    list.set_inner_html("");
    for (title, meta) in queue_rows(jobs) {
        let card = document.create_element("div")?;
        card.set_class_name("queue-item");
        card.set_text_content(Some(&title));
        let span = document.create_element("span")?;
        span.set_text_content(Some(&meta));
        card.append_child(&span)?;
        list.append_child(&card)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    fn job(id: &str, status: JobStatus) -> Job {
        Job {
            id: id.into(),
            title: "Workflow submission".into(),
            status,
        }
    }

    #[test]
    fn empty_queue_shows_hint() {
        assert_eq!(
            queue_rows(&[]),
            vec![("No jobs queued".to_string(), "Use \"Queue Prompt\" to submit".to_string())]
        );
    }

    #[test]
    fn only_the_three_most_recent_jobs_are_shown() {
        let jobs = vec![
            job("a", JobStatus::Offline),
            job("b", JobStatus::Submitted("b".into())),
            job("c", JobStatus::Gateway("running".into())),
            job("d", JobStatus::Submitting),
        ];
        let rows = queue_rows(&jobs);
        let metas: Vec<_> = rows.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(metas, ["submitted b", "running", "submitting"]);
    }
}
