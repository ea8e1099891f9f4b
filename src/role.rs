//! User roles carried by the web app's session token.

use color_eyre::eyre::eyre;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles known to the hostel management app.
///
/// The session token carries the role as a lowercase string. Anything the
/// parser does not recognize is handled by callers as an absent role, which
/// the expiry policy maps to its conservative default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Student,
  Warden,
  Admin,
  CanteenManager,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Student => "student",
      Role::Warden => "warden",
      Role::Admin => "admin",
      Role::CanteenManager => "canteen_manager",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    // Token payloads write "canteen manager" with a space; accept the
    // separators seen in the wild.
    match s.trim().to_lowercase().as_str() {
      "student" => Ok(Role::Student),
      "warden" => Ok(Role::Warden),
      "admin" => Ok(Role::Admin),
      "canteen manager" | "canteen_manager" | "canteen-manager" => Ok(Role::CanteenManager),
      other => Err(eyre!("Unrecognized role: {}", other)),
    }
  }
}
