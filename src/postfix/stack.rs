use super::Operator;

/// A LIFO used as scratch space by both the converter and the executor.
///
/// Popping an empty stack yields `None` rather than panicking so callers can
/// decide whether that means an unbalanced parenthesis or a missing operand.
#[derive(Debug, Clone)]
pub struct ValueStack<T> {
    items: Vec<T>,
}

impl<T> ValueStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Looks `depth` items down from the top; `peek(1)` is the top.
    pub fn peek(&self, depth: usize) -> Option<&T> {
        if depth == 0 || depth > self.items.len() {
            return None;
        }
        self.items.get(self.items.len() - depth)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ValueStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries of the converter's operator stack.
///
/// A function call occupies three entries, bottom to top:
/// `Call(name)`, `ArgCount(n)`, `LeftParen`.
#[derive(Debug, Clone, PartialEq)]
pub enum StackItem {
    Operator(Operator),
    LeftParen,
    Call(String),
    ArgCount(usize),
}

impl ValueStack<StackItem> {
    /// Increments the argument counter of the innermost open call.
    ///
    /// Entries above the nearest `LeftParen` are lifted off and put back
    /// unchanged. Returns `false` when there is no open parenthesis or the
    /// parenthesis does not belong to a call.
    pub fn increment_argument(&mut self) -> bool {
        let mut lifted = Vec::new();
        loop {
            match self.pop() {
                Some(StackItem::LeftParen) => break,
                Some(item) => lifted.push(item),
                None => {
                    self.restore(lifted);
                    return false;
                }
            }
        }

        let counted = match self.items.last_mut() {
            Some(StackItem::ArgCount(count)) => {
                *count += 1;
                true
            }
            _ => false,
        };

        self.push(StackItem::LeftParen);
        self.restore(lifted);
        counted
    }

    fn restore(&mut self, mut lifted: Vec<StackItem>) {
        while let Some(item) = lifted.pop() {
            self.push(item);
        }
    }
}
