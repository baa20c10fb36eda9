//! Wire types for the `/users` resource.
//!
//! Records keep every field the server sends. The four fields the UI edits
//! are typed; everything else rides along in `extra` and is written back
//! untouched on update.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Server-assigned record identifier.
pub type UserId = u64;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One user as stored by the remote API. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: Address,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Build a record with only the editable fields set.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            username: username.into(),
            email: email.into(),
            address: Address {
                city: city.into(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn city(&self) -> &str {
        &self.address.city
    }
}

/// Editable fields of a record, as shown in the create/edit form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Username,
    Email,
    City,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Username, Field::Email, Field::City];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Username => "Username",
            Field::Email => "Email",
            Field::City => "City",
        }
    }
}

/// Unsaved field values for a record being created or edited. Has no id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub username: String,
    pub email: String,
    pub city: String,
}

/// Body of `POST /users`.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct DraftPayload<'a> {
    name: &'a str,
    username: &'a str,
    email: &'a str,
    address: CityPayload<'a>,
}

#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct CityPayload<'a> {
    city: &'a str,
}

impl Draft {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            city: record.address.city.clone(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::City => &self.city,
        }
    }

    /// Return a copy with one field replaced.
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::City => self.city = value,
        }
        self
    }

    /// Overlay the draft onto `source`, keeping its id and opaque fields.
    pub fn apply_to(&self, source: &UserRecord) -> UserRecord {
        let mut out = source.clone();
        out.name = self.name.clone();
        out.username = self.username.clone();
        out.email = self.email.clone();
        out.address.city = self.city.clone();
        out
    }

    /// Borrowed view sent as the body of `POST /users`.
    pub(crate) fn payload(&self) -> DraftPayload<'_> {
        DraftPayload {
            name: &self.name,
            username: &self.username,
            email: &self.email,
            address: CityPayload { city: &self.city },
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "id": 1,
            "name": "Leanne Graham",
            "username": "Bret",
            "email": "Sincere@april.biz",
            "address": { "street": "Kulas Light", "city": "Gwenborough" },
            "phone": "1-770-736-8031 x56442",
            "company": { "name": "Romaguera-Crona" }
        });
        let user: UserRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.city(), "Gwenborough");
        assert_eq!(user.extra["phone"], "1-770-736-8031 x56442");
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn missing_or_null_fields_read_as_empty() {
        let user: UserRecord =
            serde_json::from_value(json!({ "id": 7, "name": null })).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "");
        assert_eq!(user.username, "");
        assert_eq!(user.city(), "");
    }

    #[test]
    fn draft_payload_nests_city_under_address() {
        let draft = Draft::default()
            .with_field(Field::Name, "A")
            .with_field(Field::Username, "a")
            .with_field(Field::Email, "a@x.com")
            .with_field(Field::City, "NY");
        assert_eq!(
            serde_json::to_value(draft.payload()).unwrap(),
            json!({
                "name": "A",
                "username": "a",
                "email": "a@x.com",
                "address": { "city": "NY" }
            })
        );
    }

    #[test]
    fn apply_to_keeps_opaque_fields() {
        let mut source = UserRecord::new(4, "Patricia", "Karianne", "j@m.tv", "South Elvis");
        source.extra.insert("website".into(), json!("kale.biz"));
        source.address.extra.insert("zipcode".into(), json!("53919"));

        let draft = Draft::from_record(&source).with_field(Field::City, "Lebsackbury");
        let out = draft.apply_to(&source);

        assert_eq!(out.id, 4);
        assert_eq!(out.city(), "Lebsackbury");
        assert_eq!(out.extra["website"], "kale.biz");
        assert_eq!(out.address.extra["zipcode"], "53919");
        assert_eq!(out.name, "Patricia");
    }
}
