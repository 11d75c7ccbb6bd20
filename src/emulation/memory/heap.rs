//! Per-context object heap.
//!
//! Every reference the interpreter handles points into a [`Heap`]. Objects carry their
//! declared type and an [`ObjectState`]: `new` allocates an uninitialized placeholder,
//! and the constructor that runs next moves it to `Initialized` exactly once. Payload
//! reads are rejected until then.

use rustc_hash::FxHashMap;
use widestring::U16String;

use crate::{
    emulation::{EmulationError, HeapRef, HostObject, HostView, JavaValue},
    Result,
};

/// Lifecycle state of a heap object.
#[derive(Debug, Clone)]
pub enum ObjectState {
    /// Allocated by `new`, constructor not run yet
    Uninitialized,
    /// Constructed, payload available
    Initialized(HostObject),
}

/// A single heap object.
#[derive(Debug, Clone)]
pub struct HeapObject {
    /// Internal name of the declared type (or array descriptor)
    pub class_name: String,
    /// Lifecycle state and payload
    pub state: ObjectState,
}

impl HeapObject {
    /// `true` once the constructor has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ObjectState::Initialized(_))
    }

    /// The payload.
    ///
    /// # Errors
    /// Returns a state fault if the object is uninitialized.
    pub fn payload(&self) -> Result<&HostObject> {
        match &self.state {
            ObjectState::Initialized(object) => Ok(object),
            ObjectState::Uninitialized => Err(EmulationError::UninitializedObject {
                class_name: self.class_name.clone(),
            }
            .into()),
        }
    }

    fn payload_mut(&mut self) -> Result<&mut HostObject> {
        match &mut self.state {
            ObjectState::Initialized(object) => Ok(object),
            ObjectState::Uninitialized => Err(EmulationError::UninitializedObject {
                class_name: self.class_name.clone(),
            }
            .into()),
        }
    }
}

/// Object storage for one emulation.
#[derive(Debug, Clone)]
pub struct Heap {
    objects: Vec<HeapObject>,
    interned: FxHashMap<U16String, HeapRef>,
    max_objects: usize,
}

impl Heap {
    /// Creates an empty heap that holds at most `max_objects` objects.
    #[must_use]
    pub fn new(max_objects: usize) -> Self {
        Heap {
            objects: Vec::new(),
            interned: FxHashMap::default(),
            max_objects,
        }
    }

    /// Number of allocated objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn allocate(&mut self, class_name: String, state: ObjectState) -> Result<JavaValue> {
        if self.objects.len() >= self.max_objects {
            return Err(EmulationError::HeapLimitExceeded {
                limit: self.max_objects,
            }
            .into());
        }
        let id = u32::try_from(self.objects.len()).map_err(|_| EmulationError::HeapLimitExceeded {
            limit: self.max_objects,
        })?;
        self.objects.push(HeapObject { class_name, state });
        Ok(JavaValue::Reference(HeapRef::new(id)))
    }

    /// Stores an already built payload, inferring its declared type.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn wrap(&mut self, object: HostObject) -> Result<JavaValue> {
        let class_name = object.inferred_type();
        self.allocate(class_name, ObjectState::Initialized(object))
    }

    /// Stores an already built payload under an explicit declared type.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn wrap_as(&mut self, class_name: &str, object: HostObject) -> Result<JavaValue> {
        self.allocate(class_name.to_string(), ObjectState::Initialized(object))
    }

    /// Allocates an uninitialized object of `class_name`.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn placeholder(&mut self, class_name: &str) -> Result<JavaValue> {
        self.allocate(class_name.to_string(), ObjectState::Uninitialized)
    }

    /// Runs the Uninitialized to Initialized transition for a constructor of `expected_type`.
    ///
    /// # Errors
    /// Returns a type fault if the object's declared type is not `expected_type` and a
    /// state fault if it was already initialized.
    pub fn initialize(&mut self, value: JavaValue, expected_type: &str, object: HostObject) -> Result<()> {
        let target = self.object_mut(value)?;
        if target.class_name != expected_type {
            return Err(EmulationError::ConstructorTypeMismatch {
                expected: expected_type.to_string(),
                found: target.class_name.clone(),
            }
            .into());
        }
        if target.is_initialized() {
            return Err(EmulationError::AlreadyInitialized {
                class_name: target.class_name.clone(),
            }
            .into());
        }
        target.state = ObjectState::Initialized(object);
        Ok(())
    }

    /// The heap object behind a reference.
    ///
    /// # Errors
    /// Returns a runtime fault for `null`, a type fault for primitives and a state fault
    /// for handles this heap never issued.
    pub fn object(&self, value: JavaValue) -> Result<&HeapObject> {
        let reference = Self::reference(value)?;
        self.objects
            .get(reference.id() as usize)
            .ok_or_else(|| invalid(reference))
    }

    fn object_mut(&mut self, value: JavaValue) -> Result<&mut HeapObject> {
        let reference = Self::reference(value)?;
        self.objects
            .get_mut(reference.id() as usize)
            .ok_or_else(|| invalid(reference))
    }

    fn reference(value: JavaValue) -> Result<HeapRef> {
        match value {
            JavaValue::Reference(reference) => Ok(reference),
            JavaValue::Null => Err(EmulationError::NullReference.into()),
            other => Err(EmulationError::TypeMismatch {
                operation: "heap access",
                expected: "reference",
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Declared type of a reference.
    ///
    /// # Errors
    /// See [`Heap::object`].
    pub fn class_name(&self, value: JavaValue) -> Result<&str> {
        Ok(&self.object(value)?.class_name)
    }

    /// `true` once the object's constructor ran.
    ///
    /// # Errors
    /// See [`Heap::object`].
    pub fn is_initialized(&self, value: JavaValue) -> Result<bool> {
        Ok(self.object(value)?.is_initialized())
    }

    /// The payload of an initialized object.
    ///
    /// # Errors
    /// See [`Heap::object`]; additionally a state fault for uninitialized objects.
    pub fn payload(&self, value: JavaValue) -> Result<&HostObject> {
        self.object(value)?.payload()
    }

    /// Narrows an object to the host type `T`.
    ///
    /// # Errors
    /// Returns a state fault if the object is uninitialized and a type fault if its
    /// payload is not a `T`.
    pub fn narrow<T: HostView>(&self, value: JavaValue) -> Result<&T> {
        let payload = self.payload(value)?;
        T::view(payload).ok_or_else(|| {
            EmulationError::HeapTypeMismatch {
                expected: T::KIND,
                found: payload.kind(),
            }
            .into()
        })
    }

    /// Mutable form of [`Heap::narrow`].
    ///
    /// # Errors
    /// Same as [`Heap::narrow`].
    pub fn narrow_mut<T: HostView>(&mut self, value: JavaValue) -> Result<&mut T> {
        let payload = self.object_mut(value)?.payload_mut()?;
        let found = payload.kind();
        T::view_mut(payload).ok_or_else(|| {
            EmulationError::HeapTypeMismatch {
                expected: T::KIND,
                found,
            }
            .into()
        })
    }

    /// Allocates a fresh `java.lang.String`.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn alloc_string(&mut self, value: U16String) -> Result<JavaValue> {
        self.wrap(HostObject::String(value))
    }

    /// Allocates a string from Rust text.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn alloc_str(&mut self, value: &str) -> Result<JavaValue> {
        self.alloc_string(U16String::from_str(value))
    }

    /// Returns the canonical instance for a string value, allocating it on first use.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn intern(&mut self, value: &U16String) -> Result<JavaValue> {
        if let Some(reference) = self.interned.get(value) {
            return Ok(JavaValue::Reference(*reference));
        }
        let interned = self.alloc_string(value.clone())?;
        if let JavaValue::Reference(reference) = interned {
            self.interned.insert(value.clone(), reference);
        }
        Ok(interned)
    }

    /// Borrows the UTF-16 contents of a string object.
    ///
    /// # Errors
    /// Same as [`Heap::narrow`].
    pub fn string(&self, value: JavaValue) -> Result<&U16String> {
        self.narrow::<U16String>(value)
    }

    /// Decodes a string object to Rust text, replacing unpaired surrogates.
    ///
    /// # Errors
    /// Same as [`Heap::narrow`].
    pub fn rust_string(&self, value: JavaValue) -> Result<String> {
        Ok(self.string(value)?.to_string_lossy())
    }
}

fn invalid(reference: HeapRef) -> crate::Error {
    EmulationError::InvalidHeapReference {
        reference_id: reference.id(),
    }
    .into()
}
