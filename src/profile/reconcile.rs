//! Turns an untrusted partial-update body into a typed [`ProfilePatch`].
//!
//! Only keys present in the body (and not `null`) end up in the patch. Each
//! field is coerced or rejected on its own; nothing is silently discarded.

use serde_json::{Map, Value};

use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult};
use crate::users::{ProfilePatch, Project, Social};

pub fn reconcile(payload: &Value) -> AppResult<ProfilePatch> {
    let obj = payload
        .as_object()
        .ok_or_else(|| invalid("Update body must be a JSON object"))?;

    let mut patch = ProfilePatch::default();

    if let Some(v) = present(obj, "name") {
        patch.name = Some(required_string(v, "name")?);
    }
    if let Some(v) = present(obj, "email") {
        let email = required_string(v, "email")?;
        if !is_valid_email(&email) {
            return Err(invalid("Invalid email"));
        }
        patch.email = Some(email);
    }
    if let Some(v) = present(obj, "bio") {
        patch.bio = Some(plain_string(v, "bio")?);
    }
    if let Some(v) = present(obj, "avatar") {
        patch.avatar = Some(plain_string(v, "avatar")?);
    }
    if let Some(v) = present(obj, "skills") {
        patch.skills = Some(string_list(v, "skills")?);
    }
    if let Some(v) = present(obj, "social") {
        patch.social = Some(social(v)?);
    }
    if let Some(v) = present(obj, "achievements") {
        patch.achievements = Some(string_list(v, "achievements")?);
    }
    if let Some(v) = present(obj, "projects") {
        patch.projects = Some(projects(v)?);
    }
    if let Some(v) = present(obj, "level") {
        let level = integer(v, "level", 1)?;
        patch.level = Some(i32::try_from(level).map_err(|_| invalid("level is out of range"))?);
    }
    if let Some(v) = present(obj, "xp") {
        patch.xp = Some(integer(v, "xp", 0)?);
    }

    Ok(patch)
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn plain_string(v: &Value, field: &str) -> AppResult<String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("{field} must be a string")))
}

fn required_string(v: &Value, field: &str) -> AppResult<String> {
    let s = plain_string(v, field)?;
    if s.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(s)
}

/// Array of strings as-is, or a comma separated string split into trimmed,
/// non-empty pieces.
fn string_list(v: &Value, field: &str) -> AppResult<Vec<String>> {
    match v {
        Value::String(s) => Ok(split_list(s)),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(format!("{field} must contain only strings")))
            })
            .collect(),
        _ => Err(invalid(format!(
            "{field} must be a list or a comma separated string"
        ))),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Known keys only. Scalars are stored as their string form.
fn social(v: &Value) -> AppResult<Social> {
    let Value::Object(map) = v else {
        return Err(invalid("social must be an object"));
    };
    let link = |key: &str| -> AppResult<Option<String>> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
            Some(_) => Err(invalid(format!("social.{key} must be a string"))),
        }
    };
    Ok(Social {
        github: link("github")?,
        linkedin: link("linkedin")?,
        twitter: link("twitter")?,
        website: link("website")?,
    })
}

fn projects(v: &Value) -> AppResult<Vec<Project>> {
    let Value::Array(items) = v else {
        return Err(invalid("projects must be a list"));
    };
    items
        .iter()
        .map(|item| {
            let project: Project = serde_json::from_value(item.clone()).map_err(|_| {
                invalid("each project needs a title; description and link must be strings")
            })?;
            if project.title.trim().is_empty() {
                return Err(invalid("project title must not be empty"));
            }
            Ok(project)
        })
        .collect()
}

// 2^63; `i64::MAX as f64` rounds up to this, so the upper bound is exclusive.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f))
        .then_some(f as i64)
}

/// Accepts integers, integral floats and numeric strings ("5", " 7 ").
fn integer(v: &Value, field: &str, min: i64) -> AppResult<i64> {
    let parsed = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    };
    let n = parsed.ok_or_else(|| invalid(format!("{field} must be a whole number")))?;
    if n < min {
        return Err(invalid(format!("{field} must be at least {min}")));
    }
    Ok(n)
}
