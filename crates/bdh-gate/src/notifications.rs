//! Deferred notifications printed after the tracker finishes.
//!
//! Coordination failures must never interrupt or reorder tracker output, so
//! anything worth telling the user accumulates here and is flushed to
//! stderr as the wrapper's last act.

/// An append-only collection of end-of-command notices.
#[derive(Debug, Default)]
pub struct Notifications {
    items: Vec<String>,
}

impl Notifications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Flush every notice to stderr, one line each, in arrival order.
    pub fn print_to_stderr(&self) {
        for item in &self.items {
            eprintln!("bdh: {item}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_arrival_order() {
        let mut notifications = Notifications::new();
        assert!(notifications.is_empty());

        notifications.push("first");
        notifications.push(String::from("second"));

        let collected: Vec<&str> = notifications.iter().collect();
        assert_eq!(collected, ["first", "second"]);
        assert!(!notifications.is_empty());
    }
}
