use crate::error::RegistryError;
use crate::sink::SinkFactory;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named sink factories, filled in explicitly by the application at startup
#[derive(Default, Clone)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn SinkFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both store drivers shipped with this crate
    pub fn with_builtin_drivers() -> Self {
        let mut drivers: BTreeMap<String, Arc<dyn SinkFactory>> = BTreeMap::new();
        drivers.insert(
            super::line_protocol::DRIVER_NAME.to_string(),
            Arc::new(super::line_protocol::LineProtocolDriver),
        );
        drivers.insert(
            super::postgres::DRIVER_NAME.to_string(),
            Arc::new(super::postgres::PostgresDriver),
        );
        Self { drivers }
    }

    pub fn register<S: Into<String>>(
        &mut self,
        name: S,
        factory: Arc<dyn SinkFactory>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.drivers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.drivers.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SinkFactory>, RegistryError> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
                known: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
