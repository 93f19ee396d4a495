//! Objects and arrays.

use super::value::Value;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::hash::BuildHasherDefault;
use std::rc::Rc;

/// Largest length an array can have.
pub const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// Insertion-ordered property storage.
pub type PropertyMap = IndexMap<String, Value, BuildHasherDefault<FxHasher>>;

/// A script object: ordered properties plus an optional prototype.
///
/// Delegation is a single level: `get` and `has` consult the prototype's
/// own properties, never the prototype's prototype.
#[derive(Clone, Default)]
pub struct Object {
    properties: PropertyMap,
    prototype: Option<Rc<RefCell<Object>>>,
}

impl Object {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty object delegating to `prototype`.
    pub fn with_prototype(prototype: Rc<RefCell<Object>>) -> Self {
        Self {
            properties: PropertyMap::default(),
            prototype: Some(prototype),
        }
    }

    /// The prototype, if any.
    pub fn prototype(&self) -> Option<&Rc<RefCell<Object>>> {
        self.prototype.as_ref()
    }

    /// Gets an own or inherited property.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.properties.get(key) {
            return Some(value.clone());
        }
        self.prototype
            .as_ref()
            .and_then(|proto| proto.borrow().properties.get(key).cloned())
    }

    /// Gets an own property.
    pub fn get_own(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Sets an own property; never writes through to the prototype.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    /// Removes an own property, keeping the order of the others.
    pub fn delete(&mut self, key: &str) -> bool {
        self.properties.shift_remove(key).is_some()
    }

    /// Checks own and inherited properties.
    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
            || self
                .prototype
                .as_ref()
                .is_some_and(|proto| proto.borrow().properties.contains_key(key))
    }

    /// Checks own properties only.
    pub fn has_own(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Own property keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// The own property map.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if there are no own properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// A script array: an element vector plus ordinary properties.
///
/// Numeric keys address elements, `length` is synthesized from the element
/// count, and every other key is an ordinary property.
#[derive(Clone, Default)]
pub struct Array {
    /// The elements
    pub elements: Vec<Value>,
    properties: PropertyMap,
}

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an element, `length`, or an ordinary property.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == "length" {
            return Some(Value::from(self.elements.len()));
        }
        match array_index(key) {
            Some(index) => self.elements.get(index).cloned(),
            None => self.properties.get(key).cloned(),
        }
    }

    /// Sets an element (padding with undefined), the length (truncating or
    /// padding), or an ordinary property. Growing past `limit` (itself capped
    /// at [`MAX_ARRAY_LENGTH`]) is a RangeError.
    pub fn set(&mut self, key: &str, value: Value, limit: usize) -> Result<()> {
        if key == "length" {
            let length = value.to_number();
            if length.fract() != 0.0 || length < 0.0 || length > MAX_ARRAY_LENGTH as f64 {
                return Err(invalid_length());
            }
            let length = length as usize;
            if length > self.elements.len() && length > limit.min(MAX_ARRAY_LENGTH) {
                return Err(invalid_length());
            }
            self.elements.resize(length, Value::Undefined);
            return Ok(());
        }
        match array_index(key).filter(|&index| index < MAX_ARRAY_LENGTH) {
            Some(index) => self.set_index(index, value, limit),
            None => {
                self.properties.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    /// Sets the element at `index`, padding with undefined.
    pub fn set_index(&mut self, index: usize, value: Value, limit: usize) -> Result<()> {
        if index >= self.elements.len() {
            if index >= limit.min(MAX_ARRAY_LENGTH) {
                return Err(invalid_length());
            }
            self.elements.resize(index + 1, Value::Undefined);
        }
        self.elements[index] = value;
        Ok(())
    }

    /// Checks whether `key` is `length`, an in-bounds index, or a property.
    pub fn has(&self, key: &str) -> bool {
        key == "length"
            || array_index(key).is_some_and(|index| index < self.elements.len())
            || self.properties.contains_key(key)
    }

    /// Deletes a property; deleting an element leaves undefined in place.
    pub fn delete(&mut self, key: &str) -> bool {
        match array_index(key) {
            Some(index) => {
                if let Some(slot) = self.elements.get_mut(index) {
                    *slot = Value::Undefined;
                }
                true
            }
            None => self.properties.shift_remove(key).is_some(),
        }
    }

    /// Index keys followed by property keys.
    pub fn keys(&self) -> Vec<String> {
        (0..self.elements.len())
            .map(|index| index.to_string())
            .chain(self.properties.keys().cloned())
            .collect()
    }

    /// The ordinary (non-index) properties.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

impl From<Vec<Value>> for Array {
    fn from(elements: Vec<Value>) -> Self {
        Self {
            elements,
            properties: PropertyMap::default(),
        }
    }
}

fn invalid_length() -> Error {
    Error::runtime("RangeError: Invalid array length")
}

/// Parses a canonical array index: digits only, no leading zeros.
pub fn array_index(key: &str) -> Option<usize> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    key.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_preserves_insertion_order() {
        let mut obj = Object::new();
        obj.set("b", Value::from(1));
        obj.set("a", Value::from(2));
        obj.set("c", Value::from(3));
        obj.delete("a");
        assert_eq!(obj.keys(), vec!["b", "c"]);
    }

    #[test]
    fn test_single_level_prototype() {
        let grand = Rc::new(RefCell::new(Object::new()));
        grand.borrow_mut().set("deep", Value::from(1));

        let proto = Rc::new(RefCell::new(Object::with_prototype(grand)));
        proto.borrow_mut().set("shared", Value::from(2));

        let mut obj = Object::with_prototype(proto.clone());
        assert_eq!(obj.get("shared"), Some(Value::from(2)));
        assert!(obj.has("shared"));
        assert!(!obj.has_own("shared"));
        assert_eq!(obj.get("deep"), None);

        obj.set("shared", Value::from(3));
        assert_eq!(proto.borrow().get("shared"), Some(Value::from(2)));
        assert_eq!(obj.get("shared"), Some(Value::from(3)));
    }

    #[test]
    fn test_array_index_routing() {
        let mut array = Array::new();
        array.set("2", Value::from("x"), 10).unwrap();
        assert_eq!(array.elements.len(), 3);
        assert_eq!(array.get("0"), Some(Value::Undefined));
        assert_eq!(array.get("length"), Some(Value::from(3)));

        array.set("name", Value::from("list"), 10).unwrap();
        assert_eq!(array.elements.len(), 3);
        assert_eq!(array.get("name"), Some(Value::from("list")));
        assert_eq!(array.keys(), vec!["0", "1", "2", "name"]);
    }

    #[test]
    fn test_array_length_write() {
        let mut array = Array::from(vec![Value::from(1), Value::from(2), Value::from(3)]);
        array.set("length", Value::from(1), 10).unwrap();
        assert_eq!(array.elements, vec![Value::from(1)]);
        array.set("length", Value::from(3), 10).unwrap();
        assert_eq!(array.elements.len(), 3);
        assert!(array.elements[2].is_undefined());
    }

    #[test]
    fn test_array_growth_limits() {
        let mut array = Array::from(vec![Value::from(1); 4]);
        assert!(array.set("length", Value::from(1e20), 100).is_err());
        assert!(array.set("length", Value::from(-1), 100).is_err());
        assert!(array.set("length", Value::from(1.5), 100).is_err());
        assert!(array.set("length", Value::from(101), 100).is_err());
        assert!(array.set("100", Value::from(1), 100).is_err());
        assert_eq!(array.elements.len(), 4);

        // Shrinking is always allowed, even below a smaller limit
        array.set("length", Value::from(3), 2).unwrap();
        assert_eq!(array.elements.len(), 3);

        // Past the largest index the key is an ordinary property
        array.set("4294967295", Value::from("far"), 100).unwrap();
        assert_eq!(array.elements.len(), 3);
        assert_eq!(array.get("4294967295"), Some(Value::from("far")));

        let message = array.set_index(1 << 40, Value::Null, usize::MAX).unwrap_err().message();
        assert_eq!(message, "RangeError: Invalid array length");
    }

    #[test]
    fn test_array_index_parsing() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index(""), None);
    }
}
