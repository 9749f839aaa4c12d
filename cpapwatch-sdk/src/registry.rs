//! Gauge families and the registry that owns them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::SinkError;

/// Shared state behind a [`Gauge`] handle.
#[derive(Debug)]
pub(crate) struct GaugeFamily {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) label_names: Vec<String>,
    /// Values keyed by label values, in `label_names` order.
    pub(crate) values: RwLock<BTreeMap<Vec<String>, f64>>,
}

/// A handle to a named gauge family with a fixed label schema.
///
/// Handles are cheap to clone; all clones update the same family.
///
/// # Example
///
/// ```rust
/// use cpapwatch_sdk::Registry;
///
/// let registry = Registry::new();
/// let device = registry
///     .gauge("device", "Known devices", &["serialNumber"])
///     .unwrap();
///
/// device.set(&["2319"], 1.0).unwrap();
/// device.set(&["1107"], 0.0).unwrap();
/// assert_eq!(device.len(), 2);
///
/// device.clear();
/// assert!(device.is_empty());
/// ```
#[derive(Clone)]
pub struct Gauge {
    family: Arc<GaugeFamily>,
}

impl Gauge {
    /// Metric name without namespace.
    pub fn name(&self) -> &str {
        &self.family.name
    }

    /// The label schema, in the order label values must be passed.
    pub fn label_names(&self) -> &[String] {
        &self.family.label_names
    }

    /// Set the value for one label combination.
    ///
    /// Returns [`SinkError::LabelMismatch`] if the number of label values
    /// does not match the schema.
    pub fn set(&self, label_values: &[&str], value: f64) -> Result<(), SinkError> {
        let key = self.key(label_values)?;
        self.family.values.write().insert(key, value);
        Ok(())
    }

    /// Current value for a label combination, if it has been set.
    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        let key = self.key(label_values).ok()?;
        self.family.values.read().get(&key).copied()
    }

    /// Remove every label combination from this gauge.
    pub fn clear(&self) {
        self.family.values.write().clear();
    }

    /// Number of label combinations currently exposed.
    pub fn len(&self) -> usize {
        self.family.values.read().len()
    }

    /// Check if no label combination is exposed.
    pub fn is_empty(&self) -> bool {
        self.family.values.read().is_empty()
    }

    /// All label combinations and their values, ordered by label values.
    pub fn samples(&self) -> Vec<(Vec<String>, f64)> {
        self.family
            .values
            .read()
            .iter()
            .map(|(labels, value)| (labels.clone(), *value))
            .collect()
    }

    fn key(&self, label_values: &[&str]) -> Result<Vec<String>, SinkError> {
        let expected = self.family.label_names.len();
        if label_values.len() != expected {
            return Err(SinkError::LabelMismatch {
                name: self.family.name.clone(),
                expected,
                actual: label_values.len(),
            });
        }
        Ok(label_values.iter().map(|v| v.to_string()).collect())
    }

    pub(crate) fn family(&self) -> &GaugeFamily {
        &self.family
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.family.name)
            .field("labels", &self.family.label_names)
            .finish()
    }
}

/// Owns every gauge family exposed by the process.
///
/// Construct one per process, register gauges up front, and share it
/// (behind an `Arc`) between the code that sets values and the exporter.
#[derive(Debug, Default)]
pub struct Registry {
    namespace: Option<String>,
    families: RwLock<BTreeMap<String, Arc<GaugeFamily>>>,
}

impl Registry {
    /// Create a registry without a namespace prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose metric names are prefixed with `<namespace>_`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            families: RwLock::new(BTreeMap::new()),
        }
    }

    /// The namespace prefix, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Register a gauge family or get the existing one.
    ///
    /// Registering the same name twice with the same labels returns a handle
    /// to the same family; different labels are a [`SinkError::SchemaConflict`].
    pub fn gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<Gauge, SinkError> {
        if !is_valid_metric_name(name) {
            return Err(SinkError::InvalidName(name.to_string()));
        }
        if let Some(bad) = label_names.iter().find(|l| !is_valid_label_name(l)) {
            return Err(SinkError::InvalidName(bad.to_string()));
        }

        // Fast path
        {
            let families = self.families.read();
            if let Some(family) = families.get(name) {
                return Self::existing(family, label_names);
            }
        }

        // Slow path
        let mut families = self.families.write();
        if let Some(family) = families.get(name) {
            return Self::existing(family, label_names);
        }
        let family = Arc::new(GaugeFamily {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            values: RwLock::new(BTreeMap::new()),
        });
        families.insert(name.to_string(), family.clone());
        Ok(Gauge { family })
    }

    /// All registered gauges, ordered by name.
    pub fn gauges(&self) -> Vec<Gauge> {
        self.families
            .read()
            .values()
            .map(|family| Gauge {
                family: family.clone(),
            })
            .collect()
    }

    /// Render every gauge in Prometheus text exposition format.
    pub fn render(&self) -> String {
        crate::format_prometheus(self)
    }

    fn existing(family: &Arc<GaugeFamily>, label_names: &[&str]) -> Result<Gauge, SinkError> {
        let same_schema = family.label_names.len() == label_names.len()
            && family
                .label_names
                .iter()
                .zip(label_names)
                .all(|(a, b)| a == b);
        if same_schema {
            Ok(Gauge {
                family: family.clone(),
            })
        } else {
            Err(SinkError::SchemaConflict {
                name: family.name.clone(),
                existing: family.label_names.clone(),
            })
        }
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
