//! LogLocator - TaskExecutionRef からログの置き場所を導出する
//!
//! # 学習ポイント
//! - テンプレートは起動時に一度だけパースする（未知のキーは ConfigError）
//! - resolve は純粋関数: 同じ ref + 設定なら何度呼んでも同じ結果
//! - ファイルの存在確認はしない（それは backend の仕事）

use std::path::Path;

use crate::config::{BackendConfig, ConfigError, LogConfig};
use crate::domain::{BackendKind, LogLocation, TaskExecutionRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    WorkflowId,
    TaskId,
    Timestamp,
    TryNumber,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        match key.trim() {
            "workflow_id" => Some(Placeholder::WorkflowId),
            "task_id" => Some(Placeholder::TaskId),
            "timestamp" | "ts" => Some(Placeholder::Timestamp),
            "try_number" => Some(Placeholder::TryNumber),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Key(Placeholder),
}

/// Compiled filename template, e.g. `{workflow_id}/{task_id}/{timestamp}/{try_number}.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    pub fn parse(src: &str) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = src.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(ConfigError::UnterminatedPlaceholder(src.to_string()));
                    }
                    let placeholder = Placeholder::parse(&key)
                        .ok_or_else(|| ConfigError::UnknownTemplateKey(key.trim().to_string()))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Key(placeholder));
                }
                '}' => return Err(ConfigError::UnbalancedBrace(src.to_string())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Render for one try. `try_label` is the try number or `"latest"`.
    pub fn render(&self, task: &TaskExecutionRef, try_label: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Key(Placeholder::WorkflowId) => out.push_str(&task.workflow_id),
                Segment::Key(Placeholder::TaskId) => out.push_str(&task.task_id),
                Segment::Key(Placeholder::Timestamp) => out.push_str(&task.timestamp_str()),
                Segment::Key(Placeholder::TryNumber) => out.push_str(try_label),
            }
        }
        out
    }
}

/// Resolves `LogLocation`s for a task execution.
#[derive(Debug, Clone)]
pub struct LogLocator {
    template: FilenameTemplate,
    backends: Vec<BackendConfig>,
    latest_alias: bool,
}

impl LogLocator {
    pub fn from_config(config: &LogConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            template: FilenameTemplate::parse(&config.filename_template)?,
            backends: config.backends.clone(),
            latest_alias: config.latest_alias,
        })
    }

    /// One location per (try, backend): tries ascending, `backends` order within a try.
    ///
    /// `latest_try` はタスクの本当の最新 try（lookup の結果）。
    /// `latest_alias` が有効で、その try が `tries` に含まれる時だけ、
    /// その try の後ろに backend ごとの alias を追加します。
    /// 空のアドレスになった location もそのまま返します（aggregator が警告して飛ばす）。
    pub fn resolve(
        &self,
        task: &TaskExecutionRef,
        tries: &[u32],
        backends: &[BackendKind],
        latest_try: u32,
    ) -> Result<Vec<LogLocation>, ConfigError> {
        let configs = backends
            .iter()
            .map(|kind| {
                self.backends
                    .iter()
                    .find(|b| b.kind == *kind)
                    .ok_or(ConfigError::MissingBackend(*kind))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tries = tries.to_vec();
        tries.sort_unstable();
        tries.dedup();

        let mut locations = Vec::with_capacity(tries.len() * configs.len());
        for try_number in tries {
            let rendered = self.template.render(task, &try_number.to_string());
            for config in &configs {
                locations.push(LogLocation::new(
                    config.kind,
                    address_for(config, &rendered),
                    try_number,
                ));
            }
            if self.latest_alias && try_number == latest_try {
                let rendered = self.template.render(task, "latest");
                for config in &configs {
                    locations.push(
                        LogLocation::new(config.kind, address_for(config, &rendered), try_number)
                            .as_alias(),
                    );
                }
            }
        }
        Ok(locations)
    }
}

fn address_for(config: &BackendConfig, rendered: &str) -> String {
    let rendered = rendered.trim();
    if rendered.is_empty() {
        return String::new();
    }
    match config.kind {
        BackendKind::Local => Path::new(&config.base)
            .join(rendered.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned(),
        BackendKind::RemoteHost => join_url(&config.base, rendered),
        BackendKind::Archive => match config.prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => join_key(prefix, rendered),
            _ => rendered.trim_start_matches('/').to_string(),
        },
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn join_key(prefix: &str, key: &str) -> String {
    format!("{}/{}", prefix.trim_matches('/'), key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn task() -> TaskExecutionRef {
        TaskExecutionRef::new("etl_daily", "extract", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn config() -> LogConfig {
        LogConfig {
            backends: vec![
                BackendConfig::new(BackendKind::Local, "/var/log/workers"),
                BackendConfig::new(BackendKind::RemoteHost, "http://worker-1:8793/log/"),
                BackendConfig::new(BackendKind::Archive, "/mnt/archive").with_prefix("rotated"),
            ],
            ..LogConfig::default()
        }
    }

    #[test]
    fn renders_default_template() {
        let t = FilenameTemplate::parse(crate::config::DEFAULT_FILENAME_TEMPLATE).unwrap();
        assert_eq!(
            t.render(&task(), "1"),
            "etl_daily/extract/2024-01-01T00:00:00+00:00/1.log"
        );
    }

    #[test]
    fn ts_is_an_alias_of_timestamp() {
        let t = FilenameTemplate::parse("{ts}-{ try_number }").unwrap();
        assert_eq!(t.render(&task(), "2"), "2024-01-01T00:00:00+00:00-2");
    }

    #[rstest]
    #[case("{workflow_id}/{dag_id}.log")]
    #[case("{}/x.log")]
    fn unknown_keys_are_configuration_errors(#[case] src: &str) {
        assert!(matches!(
            FilenameTemplate::parse(src),
            Err(ConfigError::UnknownTemplateKey(_))
        ));
    }

    #[test]
    fn unterminated_and_stray_braces_are_rejected() {
        assert!(matches!(
            FilenameTemplate::parse("{workflow_id/x.log"),
            Err(ConfigError::UnterminatedPlaceholder(_))
        ));
        assert!(matches!(
            FilenameTemplate::parse("workflow_id}/x.log"),
            Err(ConfigError::UnbalancedBrace(_))
        ));
    }

    #[test]
    fn one_location_per_try_and_backend_in_order() {
        let locator = LogLocator::from_config(&config()).unwrap();
        let locations = locator
            .resolve(
                &task(),
                &[2, 1],
                &[BackendKind::Local, BackendKind::RemoteHost, BackendKind::Archive],
                2,
            )
            .unwrap();

        let order: Vec<(u32, BackendKind)> =
            locations.iter().map(|l| (l.try_number, l.backend_kind)).collect();
        assert_eq!(
            order,
            vec![
                (1, BackendKind::Local),
                (1, BackendKind::RemoteHost),
                (1, BackendKind::Archive),
                (2, BackendKind::Local),
                (2, BackendKind::RemoteHost),
                (2, BackendKind::Archive),
            ]
        );
        assert_eq!(
            locations[0].address,
            "/var/log/workers/etl_daily/extract/2024-01-01T00:00:00+00:00/1.log"
        );
        assert_eq!(
            locations[1].address,
            "http://worker-1:8793/log/etl_daily/extract/2024-01-01T00:00:00+00:00/1.log"
        );
        assert_eq!(
            locations[2].address,
            "rotated/etl_daily/extract/2024-01-01T00:00:00+00:00/1.log"
        );
    }

    #[test]
    fn resolve_is_deterministic() {
        let locator = LogLocator::from_config(&config()).unwrap();
        let backends = [BackendKind::RemoteHost, BackendKind::Local];
        let first = locator.resolve(&task(), &[1, 2, 3], &backends, 3).unwrap();
        for _ in 0..5 {
            assert_eq!(locator.resolve(&task(), &[1, 2, 3], &backends, 3).unwrap(), first);
        }
        assert_eq!(first[0].backend_kind, BackendKind::RemoteHost);
    }

    #[test]
    fn latest_alias_follows_newest_try() {
        let mut c = config();
        c.latest_alias = true;
        let locator = LogLocator::from_config(&c).unwrap();
        let locations = locator.resolve(&task(), &[1, 2], &[BackendKind::Local], 2).unwrap();

        assert_eq!(locations.len(), 3);
        let alias = &locations[2];
        assert!(alias.alias);
        assert_eq!(alias.try_number, 2);
        assert!(alias.address.ends_with("/latest.log"));
    }

    #[rstest]
    #[case(&[1], 3)]
    #[case(&[1, 2], 3)]
    #[case(&[2], 0)]
    fn latest_alias_needs_the_real_latest_try(#[case] tries: &[u32], #[case] latest_try: u32) {
        let mut c = config();
        c.latest_alias = true;
        let locator = LogLocator::from_config(&c).unwrap();
        let locations = locator.resolve(&task(), tries, &[BackendKind::Local], latest_try).unwrap();

        assert_eq!(locations.len(), tries.len());
        assert!(locations.iter().all(|l| !l.alias));
    }

    #[test]
    fn unconfigured_backend_is_a_configuration_error() {
        let c = LogConfig::default();
        let locator = LogLocator::from_config(&c).unwrap();
        let err = locator
            .resolve(&task(), &[1], &[BackendKind::Archive], 1)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackend(BackendKind::Archive)));
    }

    #[test]
    fn empty_rendering_gives_empty_address() {
        let c = LogConfig {
            filename_template: String::new(),
            ..config()
        };
        let locator = LogLocator::from_config(&c).unwrap();
        let locations = locator.resolve(&task(), &[1], &[BackendKind::Local], 1).unwrap();
        assert_eq!(locations.len(), 1);
        assert!(!locations[0].has_address());
    }

    #[test]
    fn no_tries_no_locations() {
        let locator = LogLocator::from_config(&config()).unwrap();
        assert!(locator.resolve(&task(), &[], &[BackendKind::Local], 0).unwrap().is_empty());
    }
}
