//! Sequential plugin chain execution with per-plugin failure isolation.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use sitesift_shared::{PluginOutcome, PluginStatus, ResultMap};

use crate::Plugin;

/// Run a plugin chain over a seed mapping.
///
/// Plugins run strictly in order; each sees the mapping as enriched by all
/// prior successful plugins. A plugin that errors (or panics) produces a
/// `Failed` outcome with the captured error, its output is discarded, and
/// the chain continues on the last known-good mapping.
///
/// Returns the per-plugin outcomes and the cumulative merged mapping.
pub fn run_chain(plugins: &[Box<dyn Plugin>], seed: ResultMap) -> (Vec<PluginOutcome>, ResultMap) {
    let mut current = seed;
    let mut outcomes = Vec::with_capacity(plugins.len());

    for plugin in plugins {
        let name = plugin.metadata().name;

        let result = catch_unwind(AssertUnwindSafe(|| plugin.process(&current)));

        match result {
            Ok(Ok(next)) => {
                let fields = added_fields(&current, &next);
                debug!(plugin = %name, fields = fields.len(), "plugin applied");
                outcomes.push(PluginOutcome {
                    plugin_name: name,
                    status: PluginStatus::Applied,
                    error: None,
                    fields,
                });
                current = next;
            }
            Ok(Err(e)) => {
                warn!(plugin = %name, error = %e, "plugin failed, continuing chain");
                outcomes.push(PluginOutcome {
                    plugin_name: name,
                    status: PluginStatus::Failed,
                    error: Some(e.to_string()),
                    fields: ResultMap::new(),
                });
            }
            Err(panic) => {
                let message = panic_message(panic);
                warn!(plugin = %name, error = %message, "plugin panicked, continuing chain");
                outcomes.push(PluginOutcome {
                    plugin_name: name,
                    status: PluginStatus::Failed,
                    error: Some(message),
                    fields: ResultMap::new(),
                });
            }
        }
    }

    (outcomes, current)
}

/// Outcome for a configured identifier that resolved to no plugin.
pub fn skipped_outcome(identifier: &str) -> PluginOutcome {
    PluginOutcome {
        plugin_name: identifier.to_string(),
        status: PluginStatus::Skipped,
        error: Some(format!("unknown plugin identifier '{identifier}'")),
        fields: ResultMap::new(),
    }
}

/// Keys the plugin added or changed relative to its input.
fn added_fields(before: &ResultMap, after: &ResultMap) -> ResultMap {
    after
        .iter()
        .filter(|(k, v)| before.get(*k) != Some(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "plugin panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitesift_shared::SitesiftError;

    use super::*;
    use crate::PluginMetadata;

    struct AppendPlugin {
        key: &'static str,
        value: &'static str,
    }

    impl Plugin for AppendPlugin {
        fn process(&self, data: &ResultMap) -> sitesift_shared::Result<ResultMap> {
            let mut next = data.clone();
            next.insert(self.key.to_string(), json!(self.value));
            Ok(next)
        }

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: self.key.to_string(),
                version: "1.0.0".into(),
                description: "test append plugin".into(),
            }
        }
    }

    struct FailingPlugin;

    impl Plugin for FailingPlugin {
        fn process(&self, _data: &ResultMap) -> sitesift_shared::Result<ResultMap> {
            Err(SitesiftError::plugin("failing", "deliberate failure"))
        }

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "failing".into(),
                version: "1.0.0".into(),
                description: "always fails".into(),
            }
        }
    }

    struct PanickingPlugin;

    impl Plugin for PanickingPlugin {
        fn process(&self, _data: &ResultMap) -> sitesift_shared::Result<ResultMap> {
            panic!("deliberate panic")
        }

        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "panicking".into(),
                version: "1.0.0".into(),
                description: "always panics".into(),
            }
        }
    }

    #[test]
    fn plugins_compose_sequentially() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(AppendPlugin {
                key: "first",
                value: "a",
            }),
            Box::new(AppendPlugin {
                key: "second",
                value: "b",
            }),
        ];

        let (outcomes, merged) = run_chain(&plugins, ResultMap::new());

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == PluginStatus::Applied));
        assert_eq!(merged.get("first"), Some(&json!("a")));
        assert_eq!(merged.get("second"), Some(&json!("b")));
        // Each outcome records only the fields its plugin added
        assert_eq!(outcomes[0].fields.len(), 1);
        assert_eq!(outcomes[1].fields.len(), 1);
    }

    #[test]
    fn failing_plugin_is_isolated() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(AppendPlugin {
                key: "before",
                value: "x",
            }),
            Box::new(FailingPlugin),
            Box::new(AppendPlugin {
                key: "after",
                value: "y",
            }),
        ];

        let (outcomes, merged) = run_chain(&plugins, ResultMap::new());

        assert_eq!(outcomes[1].status, PluginStatus::Failed);
        assert!(outcomes[1].error.as_deref().unwrap_or_default().contains("deliberate"));
        // The chain kept going on the last known-good mapping
        assert_eq!(outcomes[2].status, PluginStatus::Applied);
        assert_eq!(merged.get("before"), Some(&json!("x")));
        assert_eq!(merged.get("after"), Some(&json!("y")));
    }

    #[test]
    fn panicking_plugin_is_isolated() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(PanickingPlugin),
            Box::new(AppendPlugin {
                key: "after",
                value: "y",
            }),
        ];

        let (outcomes, merged) = run_chain(&plugins, ResultMap::new());

        assert_eq!(outcomes[0].status, PluginStatus::Failed);
        assert_eq!(outcomes[0].error.as_deref(), Some("deliberate panic"));
        assert_eq!(merged.get("after"), Some(&json!("y")));
    }

    #[test]
    fn skipped_outcome_names_the_identifier() {
        let outcome = skipped_outcome("no-such-plugin");
        assert_eq!(outcome.status, PluginStatus::Skipped);
        assert!(outcome.error.unwrap().contains("no-such-plugin"));
    }
}
