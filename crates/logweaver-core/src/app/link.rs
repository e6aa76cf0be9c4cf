//! "Worker Logs" deep link for a task execution.

use reqwest::Url;

use crate::config::ConfigError;
use crate::domain::TaskExecutionRef;

const VIEW_PATH: &str = "workerlogs";

/// `<base_url>/workerlogs?workflow_id=..&task_id=..&execution_timestamp=..[&try_number=..]`
pub fn viewer_link(base_url: &str, task: &TaskExecutionRef) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base url".to_string()))?
        .pop_if_empty()
        .push(VIEW_PATH);

    {
        let mut query = url.query_pairs_mut();
        query
            .clear()
            .append_pair("workflow_id", &task.workflow_id)
            .append_pair("task_id", &task.task_id)
            .append_pair("execution_timestamp", &task.timestamp_str());
        if let Some(n) = task.try_number {
            query.append_pair("try_number", &n.to_string());
        }
    }
    Ok(url)
}
