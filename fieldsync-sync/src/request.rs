//! The query each side is asked to answer.

use chrono::{DateTime, Utc};
use fieldsync_model::MappingManual;
use fieldsync_types::Side;
use serde::{Deserialize, Serialize};

/// One object type and the fields requested for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestObject {
    object: String,
    fields: Vec<String>,
}

impl RequestObject {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a requested field. Adding the same field twice is a no-op.
    pub fn add_field(&mut self, field: impl Into<String>) -> &mut Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Objects changed since `from_timestamp`, restricted to the listed
/// object types and fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDao {
    from_timestamp: DateTime<Utc>,
    objects: Vec<RequestObject>,
}

impl RequestDao {
    pub fn new(from_timestamp: DateTime<Utc>) -> Self {
        Self {
            from_timestamp,
            objects: Vec::new(),
        }
    }

    /// Builds the request for `side` from every field the manual maps on
    /// that side.
    pub fn for_side(manual: &MappingManual, side: Side, from_timestamp: DateTime<Utc>) -> Self {
        let mut request = Self::new(from_timestamp);
        for entity in manual.entities(side) {
            let mut object = RequestObject::new(entity);
            for field in manual.fields_for(side.outgoing(), entity) {
                object.add_field(field);
            }
            request.add_object(object);
        }
        request
    }

    pub fn add_object(&mut self, object: RequestObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn from_timestamp(&self) -> DateTime<Utc> {
        self.from_timestamp
    }

    pub fn objects(&self) -> &[RequestObject] {
        &self.objects
    }

    /// The request for one object type.
    pub fn object(&self, name: &str) -> Option<&RequestObject> {
        self.objects.iter().find(|o| o.object == name)
    }
}
