/// Observer slots for session output and exit notifications
use std::sync::Mutex;

use tracing::trace;

use super::{ExitInfo, PtyError, lock};

/// Called once per chunk of child output, in production order
pub type DataObserver = Box<dyn FnMut(&[u8]) + Send>;

/// Called exactly once when the child terminates
pub type ExitObserver = Box<dyn FnOnce(ExitInfo) + Send>;

#[derive(Default)]
struct Slots {
    data: Option<DataObserver>,
    data_registered: bool,
    // output that arrived before anyone was listening
    pending_data: Vec<Vec<u8>>,
    exit: Option<ExitObserver>,
    exit_registered: bool,
    pending_exit: Option<ExitInfo>,
    exit_seen: bool,
    closed: bool,
}

/// Single-registration observer slots shared between a session and its
/// dispatcher task.
///
/// Data callbacks run while the slot lock is held so that a concurrent
/// registration replay and a live delivery can never interleave. Observers
/// must therefore not call back into the owning session's registration or
/// `terminate` from inside a data callback.
#[derive(Default)]
pub(crate) struct Observers {
    slots: Mutex<Slots>,
}

impl Observers {
    pub(crate) fn set_data(&self, mut observer: DataObserver) -> Result<(), PtyError> {
        let mut slots = lock(&self.slots);
        if slots.data_registered {
            return Err(PtyError::ObserverAlreadyRegistered("data"));
        }
        slots.data_registered = true;

        let pending = std::mem::take(&mut slots.pending_data);
        if !slots.closed {
            if !pending.is_empty() {
                trace!("Replaying {} buffered output chunks", pending.len());
            }
            for chunk in &pending {
                observer(chunk);
            }
        }
        slots.data = Some(observer);
        Ok(())
    }

    pub(crate) fn set_exit(&self, observer: ExitObserver) -> Result<(), PtyError> {
        let exit = {
            let mut slots = lock(&self.slots);
            if slots.exit_registered {
                return Err(PtyError::ObserverAlreadyRegistered("exit"));
            }
            slots.exit_registered = true;
            match slots.pending_exit.take() {
                Some(exit) => exit,
                None => {
                    slots.exit = Some(observer);
                    return Ok(());
                }
            }
        };

        // the child is already gone
        observer(exit);
        Ok(())
    }

    pub(crate) fn deliver_data(&self, chunk: Vec<u8>) {
        let mut slots = lock(&self.slots);
        if slots.closed || slots.exit_seen {
            trace!("Dropping {} bytes of output from closed session", chunk.len());
            return;
        }
        match slots.data.as_mut() {
            Some(observer) => observer(&chunk),
            None => slots.pending_data.push(chunk),
        }
    }

    /// Returns false if an exit was already delivered.
    pub(crate) fn deliver_exit(&self, exit: ExitInfo) -> bool {
        let observer = {
            let mut slots = lock(&self.slots);
            if slots.exit_seen {
                return false;
            }
            slots.exit_seen = true;
            slots.pending_data.clear();
            match slots.exit.take() {
                Some(observer) => observer,
                None => {
                    slots.pending_exit = Some(exit);
                    return true;
                }
            }
        };
        observer(exit);
        true
    }

    /// Stop all further data delivery. Waits for an in-flight data callback.
    pub(crate) fn close(&self) {
        let mut slots = lock(&self.slots);
        slots.closed = true;
        slots.pending_data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u8>>>, DataObserver) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: DataObserver =
            Box::new(move |chunk: &[u8]| sink.lock().unwrap().extend_from_slice(chunk));
        (seen, observer)
    }

    fn exit(code: u32) -> ExitInfo {
        ExitInfo {
            exit_code: code,
            signal: None,
        }
    }

    #[test]
    fn early_output_is_replayed_in_order() {
        let observers = Observers::default();
        observers.deliver_data(b"one ".to_vec());
        observers.deliver_data(b"two ".to_vec());

        let (seen, observer) = recorder();
        observers.set_data(observer).unwrap();
        observers.deliver_data(b"three".to_vec());

        assert_eq!(seen.lock().unwrap().as_slice(), b"one two three");
    }

    #[test]
    fn second_registration_is_rejected() {
        let observers = Observers::default();
        let (_, first) = recorder();
        let (_, second) = recorder();
        observers.set_data(first).unwrap();
        assert!(matches!(
            observers.set_data(second),
            Err(PtyError::ObserverAlreadyRegistered("data"))
        ));

        observers.set_exit(Box::new(|_: ExitInfo| {})).unwrap();
        assert!(matches!(
            observers.set_exit(Box::new(|_: ExitInfo| {})),
            Err(PtyError::ObserverAlreadyRegistered("exit"))
        ));
    }

    #[test]
    fn exit_fires_once() {
        let observers = Observers::default();
        let count = Arc::new(Mutex::new(Vec::new()));
        let counter = count.clone();
        observers
            .set_exit(Box::new(move |info: ExitInfo| counter.lock().unwrap().push(info)))
            .unwrap();

        assert!(observers.deliver_exit(exit(0)));
        assert!(!observers.deliver_exit(exit(1)));
        assert_eq!(count.lock().unwrap().as_slice(), &[exit(0)]);
    }

    #[test]
    fn late_exit_observer_is_called_immediately() {
        let observers = Observers::default();
        observers.deliver_exit(exit(3));

        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        observers
            .set_exit(Box::new(move |info: ExitInfo| *slot.lock().unwrap() = Some(info)))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(exit(3)));
    }

    #[test]
    fn no_data_after_close_or_exit() {
        let observers = Observers::default();
        let (seen, observer) = recorder();
        observers.set_data(observer).unwrap();

        observers.deliver_data(b"before".to_vec());
        observers.close();
        observers.deliver_data(b"after".to_vec());
        assert_eq!(seen.lock().unwrap().as_slice(), b"before");

        let observers = Observers::default();
        let (seen, observer) = recorder();
        observers.set_data(observer).unwrap();
        observers.deliver_exit(exit(0));
        observers.deliver_data(b"late".to_vec());
        assert!(seen.lock().unwrap().is_empty());
    }
}
