/// Common test fixtures
///
/// `UserModel` mirrors the table used by the seed data files under
/// `tests/fixtures`: hash key `id`, range key `gender`, optional `name`
/// and `age`.
use super::{Deserialize, Serialize};
use docstore::Document;

/// User record keyed by id and gender
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct UserModel {
    pub id: String,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

impl Document for UserModel {
    const TABLE: &'static str = "UserModel";
    const PARTITION_KEY: &'static str = "id";
    const SORT_KEY: &'static str = "gender";
    const ATTRIBUTES: &'static [&'static str] = &["id", "gender", "name", "age"];

    fn partition_key(&self) -> String {
        self.id.clone()
    }

    fn sort_key(&self) -> String {
        self.gender.clone()
    }
}

/// First user of the seed file
#[allow(dead_code)]
pub fn yamada() -> UserModel {
    UserModel {
        id: "yama1010".to_string(),
        gender: "man".to_string(),
        name: Some("yamada".to_string()),
        age: Some(10),
    }
}

/// Second user of the seed file
#[allow(dead_code)]
pub fn morita() -> UserModel {
    UserModel {
        id: "mori9910".to_string(),
        gender: "man".to_string(),
        name: Some("morita".to_string()),
        age: Some(20),
    }
}
