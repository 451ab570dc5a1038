//! Ctrl-C handling for an export run.
//!
//! The first interrupt stops collection after the current page. A second one,
//! or any interrupt once collection has finished, exits the process.

use tabula_client::StopSignal;

/// Exit status after an interrupt, as a shell reports SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Finish the current page, then save what was collected.
    Stop,
    /// Leave now.
    Exit,
}

/// Decide what one interrupt does, triggering `stop` on the first.
pub fn on_interrupt(stop: &StopSignal) -> Interrupt {
    if stop.is_stopped() {
        return Interrupt::Exit;
    }
    stop.trigger();
    Interrupt::Stop
}

/// Listen for Ctrl-C for the rest of the process.
pub fn watch(stop: StopSignal) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&stop) {
                Interrupt::Stop => {
                    tracing::warn!("interrupted; stopping after the current page (Ctrl-C again to quit)");
                }
                Interrupt::Exit => {
                    eprintln!("Interrupted.");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_interrupt_stops_second_exits() {
        let stop = StopSignal::new();
        assert_eq!(on_interrupt(&stop), Interrupt::Stop);
        assert!(stop.is_stopped());
        assert_eq!(on_interrupt(&stop), Interrupt::Exit);
        assert_eq!(on_interrupt(&stop), Interrupt::Exit);
    }

    #[test]
    fn test_interrupt_after_collection_exits() {
        let stop = StopSignal::new();
        // collection finished: the signal is spent
        stop.trigger();
        assert_eq!(on_interrupt(&stop), Interrupt::Exit);
    }
}
