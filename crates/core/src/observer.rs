/// Receives solver events and optionally steers the solver.
///
/// Each solver defines its own event type `E` and action type `A`. Returning
/// `None` lets the solver continue unchanged.
pub trait Observer<E, A> {
    /// Observes a solver event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

/// Blanket implementation for observer closures.
impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

/// A no-op observer that always returns `None`.
impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Action {
        Stop,
    }

    fn drive<O: Observer<usize, Action>>(mut observer: O, events: usize) -> usize {
        for event in 0..events {
            if observer.observe(&event) == Some(Action::Stop) {
                return event;
            }
        }
        events
    }

    #[test]
    fn closure_observer_can_stop() {
        let stopped_at = drive(|event: &usize| (*event == 3).then_some(Action::Stop), 10);
        assert_eq!(stopped_at, 3);
    }

    #[test]
    fn unit_observer_never_acts() {
        assert_eq!(drive((), 10), 10);
    }
}
