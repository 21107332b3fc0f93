//! Progress events: an observable step/sub-step lifecycle for external
//! UIs. Purely additive; emission never back-pressures the validator.

/// Lifecycle notifications emitted during a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// Walk is about to begin; `data_files` counts the CSV data files
    /// found in the first pass.
    Start { total_files: usize, data_files: usize },
    /// A named top-level step began.
    Step { name: &'static str },
    /// A per-file sub-step within the walk.
    SubStep { step: &'static str, path: String },
    /// All checks for one file completed.
    FileDone { path: String },
    /// The run finished with the given verdict.
    Complete { valid: bool },
}

type Observer = Box<dyn Fn(&ValidationEvent) + Send + Sync>;

/// Fan-out of validation events to registered observers.
#[derive(Default)]
pub struct EventEmitter {
    observers: Vec<Observer>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Fn(&ValidationEvent) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn emit(&self, event: ValidationEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }
}
