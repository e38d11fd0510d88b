//! The shared configuration data model.
//!
//! Both the text and binary INI decoders produce the same shape: an ordered
//! sequence of sections, each holding an ordered list of `key -> values`
//! entries. Sections with the same name are deliberately not merged:
//! `[Object]` appears hundreds of times per system file and every instance
//! is distinct. Grouping is a caller concern.

/// A single decoded value.
///
/// The text dialect additionally recognizes the literals `true`/`false`;
/// the binary encoding has no boolean type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
    /// A comma-separated composite, e.g. `pos = 40, 0, 25`. Each component
    /// is coerced independently.
    Tuple(Vec<Value>),
}

impl Value {
    /// Returns the string contents if this is a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric contents widened to `f64`, for `Int` and `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    /// Returns the integer contents if this is an `Int` value.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tuple(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
        }
    }
}

/// The value(s) recorded for one key within a section.
///
/// Decoders always produce the unfolded shape: every key maps to a
/// `Sequence` holding one element per occurrence, in occurrence order.
/// [`Document::fold`] normalizes single-element sequences into scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl Entry {
    /// The number of recorded occurrences.
    pub fn len(&self) -> usize {
        match self {
            Entry::Scalar(_) => 1,
            Entry::Sequence(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the occurrences regardless of folded state.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        match self {
            Entry::Scalar(value) => std::slice::from_ref(value).iter(),
            Entry::Sequence(values) => values.iter(),
        }
    }

    fn fold(self) -> Entry {
        match self {
            Entry::Sequence(mut values) if values.len() == 1 => {
                Entry::Scalar(values.remove(0))
            }
            other => other,
        }
    }
}

/// One `[section]` instance: a lower-cased name plus its entries in
/// declaration order. Lookup is first-match; repeated keys have already
/// been merged into a single [`Entry`] by the decoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, Entry)>,
}

impl Section {
    pub fn new(name: String) -> Section {
        Section {
            name,
            entries: Vec::new(),
        }
    }

    /// Records one occurrence of `key`, appending to the existing entry if
    /// the key has been seen before in this section instance.
    pub fn push(&mut self, key: &str, value: Value) {
        if let Some((_, entry)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            let mut values = match std::mem::replace(entry, Entry::Sequence(Vec::new())) {
                Entry::Scalar(first) => vec![first],
                Entry::Sequence(values) => values,
            };
            values.push(value);
            *entry = Entry::Sequence(values);
        } else {
            self.entries.push((key.to_string(), Entry::Sequence(vec![value])));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fold(self) -> Section {
        Section {
            name: self.name,
            entries: self
                .entries
                .into_iter()
                .map(|(key, entry)| (key, entry.fold()))
                .collect(),
        }
    }
}

/// A decoded configuration document: sections in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Returns every section instance with the given (lower-case) name.
    pub fn sections_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections.iter().filter(move |s| s.name == name)
    }

    /// Appends another document's sections, preserving order. Used by the
    /// facade when one logical configuration is split across several files.
    pub fn extend(&mut self, other: Document) {
        self.sections.extend(other.sections);
    }

    /// Normalizes the document: every entry with exactly one value becomes
    /// a scalar, everything else is left alone. Idempotent.
    pub fn fold(self) -> Document {
        Document {
            sections: self.sections.into_iter().map(Section::fold).collect(),
        }
    }
}
