use super::id::build_id;

/// Workload descriptor returned by [`ApiClient::list`](crate::ApiClient::list).
///
/// The dispatcher only relies on [`Info::id`]; the other fields are carried
/// for handlers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Info {
    /// Workload definition name.
    pub name: String,
    /// Workload type (e.g. `docker`).
    pub kind: String,
    /// Instance identifier reported by the launching plugin.
    pub instance: String,
    /// Last status reported for the workload, if any.
    pub status: Option<String>,
}

impl Info {
    /// Creates a descriptor without status.
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            instance: instance.into(),
            status: None,
        }
    }

    /// Attaches a status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Workload ID (`<name>/<instance>`).
    pub fn id(&self) -> String {
        build_id(&self.name, &self.instance)
    }
}
