//! Line-oriented parser engine.
//!
//! A [`LineParser`] folds command output line by line into a [`ParseState`].
//! Every registered handler sees every line, in registration order, so one
//! handler can open a record on a line while a later handler fills fields
//! from the same line. Handlers address the current record by index, never
//! by reference, so growing the record list cannot invalidate them.
//!
//! ```
//! use hostkit::parser::LineParser;
//!
//! let parser = LineParser::new("example")
//!     .handler(|state, line| {
//!         if let Some(name) = line.strip_prefix("item ") {
//!             state.add_item(vec![name.to_string()]);
//!         }
//!         Ok(())
//!     })
//!     .handler(|state, line| {
//!         if let (Some(tag), Some(item)) = (line.strip_prefix("  tag "), state.current_mut()) {
//!             item.push(tag.to_string());
//!         }
//!         Ok(())
//!     });
//!
//! let items = parser.parse("item a\n  tag x\nitem b\n").unwrap();
//! assert_eq!(items, vec![vec!["a", "x"], vec!["b"]]);
//! ```

use crate::error::Result;

/// Accumulator threaded through a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseState<T> {
    items: Vec<T>,
    current: Option<usize>,
}

impl<T> Default for ParseState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
        }
    }
}

impl<T> ParseState<T> {
    /// Append a record and make it the current one.
    pub fn add_item(&mut self, item: T) {
        self.items.push(item);
        self.current = Some(self.items.len() - 1);
    }

    /// The record field handlers should mutate, if one is open.
    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.current.and_then(|index| self.items.get_mut(index))
    }

    pub fn current(&self) -> Option<&T> {
        self.current.and_then(|index| self.items.get(index))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

type Handler<'a, T> = Box<dyn Fn(&mut ParseState<T>, &str) -> Result<()> + 'a>;

/// Ordered set of line handlers producing records of type `T`.
pub struct LineParser<'a, T> {
    source_name: String,
    handlers: Vec<Handler<'a, T>>,
}

impl<'a, T> LineParser<'a, T> {
    /// Create a parser; `source_name` only shows up in logs.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            handlers: Vec::new(),
        }
    }

    /// Register a handler. Handlers run in the order they were added.
    pub fn handler(
        mut self,
        handler: impl Fn(&mut ParseState<T>, &str) -> Result<()> + 'a,
    ) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Run every handler over every line of `text`.
    ///
    /// Lines are split on `\n` only; empty lines are passed through.
    pub fn parse(&self, text: &str) -> Result<Vec<T>> {
        let mut state = ParseState::default();
        for line in text.split('\n') {
            for handler in &self.handlers {
                handler(&mut state, line)?;
            }
        }
        log::debug!(
            "parsed {} record(s) from {}",
            state.items().len(),
            self.source_name
        );
        Ok(state.into_items())
    }
}
