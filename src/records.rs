//! Blog, user, category and post records, and their projection from the
//! structs the server returns.
//!
//! Flag members arrive as `int` 0/1 on most servers and as `boolean` on some;
//! [`wire_flag`] is the single place where either becomes a `bool`.

use time::PrimitiveDateTime;

use crate::error::Result;
use crate::xmlrpc::encoding::{parse_datetime, DecodeError, Struct, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blog {
    pub id: i32,
    pub name: String,
    pub url: String,
    /// `isAdmin`, a wire flag.
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Category {
    pub id: i32,
    pub name: String,
    /// `isPrimary`, a wire flag. Absent in `mt.getCategoryList` results.
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomField {
    /// Assigned by the server; `None` for fields not stored yet.
    pub id: Option<String>,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub date: Option<PrimitiveDateTime>,
    pub perma_link: String,
    pub description: String,
    pub text_more: String,
    pub excerpt: String,
    pub link: String,
    /// Category names.
    pub categories: Vec<String>,
    pub user_id: i32,
    /// `mt_allow_pings`, a wire flag.
    pub allow_pings: bool,
    /// `mt_allow_comments`, a wire flag.
    pub allow_comments: bool,
    /// `mt_keywords`, comma separated.
    pub tags: String,
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackbackPing {
    pub title: String,
    pub url: String,
    pub ip: String,
}

impl Post {
    pub fn add_custom_field<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.custom_fields.push(CustomField { id: None, key: key.into(), value: value.into() });
    }
}

// ---------------------------------------------------------------------------
// Projection helpers
// ---------------------------------------------------------------------------

/// Decodes a wire flag: `boolean`, or `int`/`string` 0 and 1.
pub fn wire_flag(value: &Value) -> Option<bool> {
    match *value {
        Value::Boolean(b) => Some(b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::String(ref s) if s == "0" => Some(false),
        Value::String(ref s) if s == "1" => Some(true),
        _ => None,
    }
}

fn type_error<T>(member: &str, expected: &'static str, found: &Value) -> Result<T> {
    Err(DecodeError::MemberType {
        member: member.to_string(),
        expected,
        found: found.kind(),
    }
    .into())
}

pub(crate) fn as_struct<'a>(value: &'a Value, what: &str) -> Result<&'a Struct> {
    value.as_struct().map_or_else(|| type_error(what, "struct", value), Ok)
}

pub(crate) fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match *value {
        Value::Array(ref items) => Ok(items),
        _ => type_error(what, "array", value),
    }
}

fn required<'a>(members: &'a Struct, name: &str) -> Result<&'a Value> {
    members.get(name).ok_or_else(|| DecodeError::MissingMember(name.to_string()).into())
}

/// Ids travel as `int` or as numeric `string` depending on the method.
pub(crate) fn id_value(value: &Value, member: &str) -> Result<i32> {
    match *value {
        Value::Int(n) => Ok(n),
        Value::String(ref s) => match s.trim().parse() {
            Ok(n) => Ok(n),
            Err(_) => type_error(member, "numeric id", value),
        },
        _ => type_error(member, "numeric id", value),
    }
}

fn id_member(members: &Struct, name: &str) -> Result<i32> {
    id_value(required(members, name)?, name)
}

/// Missing text members read as empty.
fn text_member(members: &Struct, name: &str) -> Result<String> {
    match members.get(name) {
        None | Some(Value::Nil) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Int(n)) => Ok(n.to_string()),
        Some(other) => type_error(name, "string", other),
    }
}

/// Missing flags read as false.
fn flag_member(members: &Struct, name: &str) -> Result<bool> {
    match members.get(name) {
        None => Ok(false),
        Some(value) => wire_flag(value).map_or_else(|| type_error(name, "0 or 1", value), Ok),
    }
}

fn date_member(members: &Struct, name: &str) -> Result<Option<PrimitiveDateTime>> {
    match members.get(name) {
        None | Some(Value::Nil) => Ok(None),
        Some(Value::DateTime(dt)) => Ok(Some(*dt)),
        Some(Value::String(s)) => Ok(Some(parse_datetime(s)?)),
        Some(other) => type_error(name, "dateTime.iso8601", other),
    }
}

fn string_list_member(members: &Struct, name: &str) -> Result<Vec<String>> {
    match members.get(name) {
        None | Some(Value::Nil) => Ok(Vec::new()),
        Some(value) => as_array(value, name)?
            .iter()
            .map(|item| match *item {
                Value::String(ref s) => Ok(s.clone()),
                _ => type_error(name, "string", item),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

impl Blog {
    pub fn from_value(value: &Value) -> Result<Blog> {
        let members = as_struct(value, "blog")?;
        Ok(Blog {
            id: id_member(members, "blogid")?,
            name: text_member(members, "blogName")?,
            url: text_member(members, "url")?,
            is_admin: flag_member(members, "isAdmin")?,
        })
    }
}

impl User {
    pub fn from_value(value: &Value) -> Result<User> {
        let members = as_struct(value, "user")?;
        Ok(User {
            id: id_member(members, "userid")?,
            first_name: text_member(members, "firstname")?,
            last_name: text_member(members, "lastname")?,
            nickname: text_member(members, "nickname")?,
            email: text_member(members, "email")?,
        })
    }
}

impl Category {
    pub fn from_value(value: &Value) -> Result<Category> {
        let members = as_struct(value, "category")?;
        Ok(Category {
            id: id_member(members, "categoryId")?,
            name: text_member(members, "categoryName")?,
            is_primary: flag_member(members, "isPrimary")?,
        })
    }

    /// The `{categoryId, isPrimary}` struct `mt.setPostCategories` expects.
    pub fn to_value(&self) -> Value {
        let mut members = Struct::new();
        members.insert("categoryId".to_string(), Value::Int(self.id));
        members.insert("isPrimary".to_string(), Value::Boolean(self.is_primary));
        Value::Struct(members)
    }
}

impl CustomField {
    pub fn from_value(value: &Value) -> Result<CustomField> {
        let members = as_struct(value, "custom field")?;
        let id = match members.get("id") {
            None | Some(Value::Nil) => None,
            Some(_) => Some(text_member(members, "id")?),
        };
        Ok(CustomField {
            id,
            key: text_member(members, "key")?,
            value: text_member(members, "value")?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut members = Struct::new();
        if let Some(ref id) = self.id {
            members.insert("id".to_string(), Value::from(id));
        }
        members.insert("key".to_string(), Value::from(&self.key));
        members.insert("value".to_string(), Value::from(&self.value));
        Value::Struct(members)
    }
}

impl Post {
    pub fn from_value(value: &Value) -> Result<Post> {
        let members = as_struct(value, "post")?;
        let custom_fields = match members.get("custom_fields") {
            None | Some(Value::Nil) => Vec::new(),
            Some(fields) => list_of(fields, "custom_fields", CustomField::from_value)?,
        };

        Ok(Post {
            id: id_member(members, "postid")?,
            title: text_member(members, "title")?,
            date: date_member(members, "dateCreated")?,
            perma_link: text_member(members, "permaLink")?,
            description: text_member(members, "description")?,
            text_more: text_member(members, "mt_text_more")?,
            excerpt: text_member(members, "mt_excerpt")?,
            link: text_member(members, "link")?,
            categories: string_list_member(members, "categories")?,
            user_id: id_member(members, "userid")?,
            allow_pings: flag_member(members, "mt_allow_pings")?,
            allow_comments: flag_member(members, "mt_allow_comments")?,
            tags: text_member(members, "mt_keywords")?,
            custom_fields,
        })
    }
}

impl TrackbackPing {
    pub fn from_value(value: &Value) -> Result<TrackbackPing> {
        let members = as_struct(value, "trackback ping")?;
        Ok(TrackbackPing {
            title: text_member(members, "pingTitle")?,
            url: text_member(members, "pingURL")?,
            ip: text_member(members, "pingIP")?,
        })
    }
}

/// Projects every element of an array result.
pub(crate) fn list_of<T, F>(value: &Value, what: &str, project: F) -> Result<Vec<T>>
where
    F: Fn(&Value) -> Result<T>,
{
    as_array(value, what)?.iter().map(project).collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{wire_flag, Blog, Category, CustomField, Post};
    use crate::error::Error;
    use crate::xmlrpc::encoding::{DecodeError, Struct, Value};

    fn post_struct() -> Struct {
        let mut field = Struct::new();
        field.insert("id".to_string(), Value::from("88"));
        field.insert("key".to_string(), Value::from("mood"));
        field.insert("value".to_string(), Value::from("sunny"));

        let mut members = Struct::new();
        members.insert("postid".to_string(), Value::from("42"));
        members.insert("title".to_string(), Value::from("Hello"));
        members.insert("dateCreated".to_string(), Value::from(datetime!(2011-03-03 10:00:00)));
        members.insert("permaLink".to_string(), Value::from("http://blog.example/?p=42"));
        members.insert("description".to_string(), Value::from("Body"));
        members.insert("mt_text_more".to_string(), Value::from("More"));
        members.insert("mt_excerpt".to_string(), Value::from("Excerpt"));
        members.insert("link".to_string(), Value::from("http://blog.example/hello"));
        members.insert("categories".to_string(), Value::from(vec!["News", "Misc"]));
        members.insert("userid".to_string(), Value::from("1"));
        members.insert("mt_allow_pings".to_string(), Value::from(0));
        members.insert("mt_allow_comments".to_string(), Value::from(1));
        members.insert("mt_keywords".to_string(), Value::from("rust, xml"));
        members.insert("custom_fields".to_string(), Value::Array(vec![Value::Struct(field)]));
        members
    }

    #[test]
    fn projects_post_fields() {
        let post = Post::from_value(&Value::Struct(post_struct())).unwrap();

        assert_eq!(42, post.id);
        assert_eq!("Hello", post.title);
        assert_eq!(Some(datetime!(2011-03-03 10:00:00)), post.date);
        assert_eq!(vec!["News".to_string(), "Misc".to_string()], post.categories);
        assert_eq!(1, post.user_id);
        assert!(!post.allow_pings);
        assert!(post.allow_comments);
        assert_eq!("rust, xml", post.tags);
        assert_eq!(
            vec![CustomField { id: Some("88".into()), key: "mood".into(), value: "sunny".into() }],
            post.custom_fields
        );
    }

    #[test]
    fn post_without_id_is_rejected() {
        let mut members = post_struct();
        members.remove("postid");

        match Post::from_value(&Value::Struct(members)) {
            Err(Error::Decode(DecodeError::MissingMember(name))) => assert_eq!("postid", name),
            other => panic!("expected a missing member, got {:?}", other),
        }
    }

    #[test]
    fn flags_accept_ints_and_booleans() {
        assert_eq!(Some(true), wire_flag(&Value::from(1)));
        assert_eq!(Some(false), wire_flag(&Value::from(0)));
        assert_eq!(Some(true), wire_flag(&Value::from(true)));
        assert_eq!(Some(false), wire_flag(&Value::from("0")));
        assert_eq!(None, wire_flag(&Value::from(2)));
        assert_eq!(None, wire_flag(&Value::from("yes")));
    }

    #[test]
    fn flag_of_wrong_type_is_an_error() {
        let mut members = Struct::new();
        members.insert("blogid".to_string(), Value::from("1"));
        members.insert("isAdmin".to_string(), Value::from("maybe"));

        let result = Blog::from_value(&Value::Struct(members));
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::MemberType { .. }))
        ));
    }

    #[test]
    fn category_round_trips_for_set_post_categories() {
        let category = Category { id: 3, name: "News".into(), is_primary: true };
        let value = category.to_value();

        assert_eq!(Some(3), value.get("categoryId").and_then(Value::as_i32));
        assert_eq!(Some(true), value.get("isPrimary").and_then(Value::as_bool));
        let unnamed = Category {
            name: String::new(),
            ..category
        };
        assert_eq!(unnamed, Category::from_value(&value).unwrap());
    }

    #[test]
    fn new_custom_fields_have_no_id() {
        let mut post = Post::default();
        post.add_custom_field("mood", "sunny");

        let value = post.custom_fields[0].to_value();
        assert!(value.get("id").is_none());
        assert_eq!(Some("sunny"), value.get("value").and_then(Value::as_str));
    }
}
