use thiserror::Error;

use crate::ast::Position;

#[derive(Clone, Debug, Error, PartialEq)]
#[error("CssSyntaxError: {reason} ({}:{})", .position.line + 1, .position.column + 1)]
pub struct CssSyntaxError {
  pub reason: String,
  /// Where the problem starts in the parsed input
  pub position: Position,
}

impl CssSyntaxError {
  pub fn new(reason: impl Into<String>, position: Position) -> Self {
    CssSyntaxError {
      reason: reason.into(),
      position,
    }
  }
}
