use std::path::PathBuf;

use crate::config::MemoryConfig;
use crate::error::{QgridError, Result};
use crate::memory::{make_memory, Memory};

/// Builder for Memory
pub struct MemoryBuilder {
    config: MemoryConfig,
}

impl MemoryBuilder {
    /// Create a new memory builder, defaulting to an unbounded array memory
    pub fn new() -> Self {
        MemoryBuilder {
            config: MemoryConfig::default(),
        }
    }

    /// Select the storage strategy by its registered id
    pub fn kind(mut self, id: &str) -> Self {
        self.config.kind = id.to_string();
        self
    }

    /// Set the capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = Some(capacity);
        self
    }

    /// Restore a saved memory instead of creating an empty one
    pub fn load_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.load_path = Some(path.into());
        self
    }

    /// Build the memory
    pub fn build(self) -> Result<Memory> {
        if let Some(path) = &self.config.load_path {
            if !path.exists() {
                return Err(QgridError::Io(format!(
                    "no saved memory at {}",
                    path.display()
                )));
            }
        }
        make_memory(&self.config)
    }
}

impl Default for MemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKind;

    #[test]
    fn test_memory_builder() {
        let memory = MemoryBuilder::new()
            .kind("deque")
            .capacity(1000)
            .build()
            .unwrap();

        assert_eq!(memory.kind(), MemoryKind::Deque);
        assert_eq!(memory.capacity(), Some(1000));

        let memory = MemoryBuilder::new().build().unwrap();
        assert_eq!(memory.kind(), MemoryKind::Array);
        assert_eq!(memory.capacity(), None);
    }

    #[test]
    fn test_builder_errors() {
        // Deque without capacity
        let result = MemoryBuilder::new().kind("deque").build();
        assert!(result.is_err());

        // Zero capacity
        let result = MemoryBuilder::new().capacity(0).build();
        assert!(result.is_err());

        // Unregistered id
        let result = MemoryBuilder::new().kind("priority").build();
        assert!(matches!(result, Err(QgridError::UnknownId { .. })));

        // Missing file
        let result = MemoryBuilder::new().load_path("/nonexistent/memory.bin").build();
        assert!(result.is_err());
    }
}
