//! Observational comparison of two snapshots.

use super::object::SchemaObject;
use super::schema::Schema;
use crate::error::Result;

/// Human-readable differences between `a` and `b`, restricted to objects
/// accepted by `filter`. An empty list means the snapshots are equivalent:
/// same names, kinds, owners and explicit field values.
///
/// Ids are not compared; a renamed object legitimately keeps its old id.
pub fn snapshot_differences(
    a: &Schema,
    b: &Schema,
    filter: impl Fn(&SchemaObject) -> bool,
) -> Result<Vec<String>> {
    let mut out = Vec::new();

    for left in a.iter().filter(|o| filter(o)) {
        let Some(right) = b.get_by_name(&left.name) else {
            out.push(format!("{} is missing", left.describe()));
            continue;
        };
        if left.kind != right.kind {
            out.push(format!("'{}' is a {} instead of a {}", left.name, right.kind, left.kind));
            continue;
        }
        let left_owner = left.owner.and_then(|o| a.get(o)).map(|o| &o.name);
        let right_owner = right.owner.and_then(|o| b.get(o)).map(|o| &o.name);
        if left_owner != right_owner {
            out.push(format!("{} has a different owner", left.describe()));
        }
        let left_fields = a.reduced_fields(left)?;
        let right_fields = b.reduced_fields(right)?;
        for (field, value) in &left_fields {
            match right_fields.get(field) {
                Some(other) if other == value => {}
                Some(other) => out.push(format!(
                    "{}: {field} is {other} instead of {value}",
                    left.describe()
                )),
                None => out.push(format!("{}: {field} is unset", left.describe())),
            }
        }
        for field in right_fields.keys().filter(|f| !left_fields.contains_key(*f)) {
            out.push(format!("{}: unexpected {field}", left.describe()));
        }
    }

    for right in b.iter().filter(|o| filter(o)) {
        if a.get_by_name(&right.name).is_none() {
            out.push(format!("unexpected {}", right.describe()));
        }
    }

    Ok(out)
}
