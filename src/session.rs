pub const PARTICIPANT_ID: &str = "participant_id";
pub const ALIAS: &str = "alias";
