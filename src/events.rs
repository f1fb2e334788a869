use crate::error::{BackupError, Result};

/// Emitted after each chunk or page: how many rows of `model` have been
/// processed so far in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEvent {
    pub model: String,
    pub count: u64,
}

impl BackupEvent {
    pub fn new(model: impl Into<String>, count: u64) -> Self {
        Self { model: model.into(), count }
    }
}

pub type Listener<'a> = Box<dyn FnMut(&BackupEvent) -> anyhow::Result<()> + 'a>;

/// Listeners for one backup invocation. Events are delivered synchronously
/// in registration order; the first listener error stops delivery and is
/// returned to the copy loop, which aborts.
#[derive(Default)]
pub struct Dispatcher<'a> {
    listeners: Vec<Listener<'a>>,
}

impl<'a> Dispatcher<'a> {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn listen<F>(&mut self, listener: F)
    where
        F: FnMut(&BackupEvent) -> anyhow::Result<()> + 'a,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, event: &BackupEvent) -> Result<()> {
        for listener in self.listeners.iter_mut() {
            listener(event).map_err(BackupError::Listener)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fans_out_in_order() {
        let seen = RefCell::new(Vec::new());
        let mut d = Dispatcher::new();
        d.listen(|e| {
            seen.borrow_mut().push(format!("a{}", e.count));
            Ok(())
        });
        d.listen(|e| {
            seen.borrow_mut().push(format!("b{}", e.count));
            Ok(())
        });
        d.dispatch(&BackupEvent::new("User", 5)).unwrap();
        drop(d);
        assert_eq!(seen.into_inner(), vec!["a5", "b5"]);
    }

    #[test]
    fn first_failure_stops_delivery() {
        let mut reached = false;
        {
            let mut d = Dispatcher::new();
            d.listen(|_| Err(anyhow::anyhow!("console closed")));
            d.listen(|_| {
                reached = true;
                Ok(())
            });
            let err = d.dispatch(&BackupEvent::new("User", 1)).unwrap_err();
            assert!(matches!(err, BackupError::Listener(_)));
        }
        assert!(!reached);
    }
}
