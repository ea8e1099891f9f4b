//! Cache key conventions for the hostel dashboards.
//!
//! The cache itself treats keys as opaque strings; this module keeps the
//! `<entity>_<owner>` naming in one place so loaders and the invalidation
//! paths agree on names.

use std::fmt;

/// Keys for the data each dashboard caches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardKey {
  /// A student's violation records
  Violations { student_id: u64 },
  /// A student's attendance summary
  Attendance { student_id: u64 },
  /// Complaints filed by a student
  Complaints { student_id: u64 },
  /// Announcements visible in a hostel
  Announcements { hostel_id: u64 },
  /// Room occupancy for a building
  Rooms { building_id: u64 },
  /// Students registered in a hostel (warden views)
  Students { hostel_id: u64 },
  /// The canteen's menu for the week
  MessMenu,
}

impl DashboardKey {
  /// Prefix shared by every key of the same entity, for pattern clears.
  pub fn family(&self) -> &'static str {
    match self {
      DashboardKey::Violations { .. } => "violations_",
      DashboardKey::Attendance { .. } => "attendance_",
      DashboardKey::Complaints { .. } => "complaints_",
      DashboardKey::Announcements { .. } => "announcements_",
      DashboardKey::Rooms { .. } => "rooms_",
      DashboardKey::Students { .. } => "students_",
      DashboardKey::MessMenu => "mess_menu",
    }
  }
}

impl fmt::Display for DashboardKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DashboardKey::Violations { student_id } => write!(f, "violations_{}", student_id),
      DashboardKey::Attendance { student_id } => write!(f, "attendance_{}", student_id),
      DashboardKey::Complaints { student_id } => write!(f, "complaints_{}", student_id),
      DashboardKey::Announcements { hostel_id } => write!(f, "announcements_{}", hostel_id),
      DashboardKey::Rooms { building_id } => write!(f, "rooms_{}", building_id),
      DashboardKey::Students { hostel_id } => write!(f, "students_{}", hostel_id),
      DashboardKey::MessMenu => f.write_str("mess_menu"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_follow_entity_owner_convention() {
    assert_eq!(
      DashboardKey::Violations { student_id: 12 }.to_string(),
      "violations_12"
    );
    assert_eq!(
      DashboardKey::Attendance { student_id: 3 }.to_string(),
      "attendance_3"
    );
    assert_eq!(
      DashboardKey::Announcements { hostel_id: 1 }.to_string(),
      "announcements_1"
    );
    assert_eq!(DashboardKey::MessMenu.to_string(), "mess_menu");
  }

  #[test]
  fn test_family_prefixes_match_rendered_keys() {
    let keys = [
      DashboardKey::Violations { student_id: 12 },
      DashboardKey::Attendance { student_id: 3 },
      DashboardKey::Complaints { student_id: 9 },
      DashboardKey::Announcements { hostel_id: 1 },
      DashboardKey::Rooms { building_id: 2 },
      DashboardKey::Students { hostel_id: 1 },
      DashboardKey::MessMenu,
    ];

    for key in keys {
      assert!(key.to_string().starts_with(key.family()));
    }
  }
}
