use cloudsign_core::SignLocation;

/// A row of `sign_locations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredLocation {
  /// Row id, increasing in registration order
  pub id: i64,
  pub group: String,
  pub location: SignLocation,
}
