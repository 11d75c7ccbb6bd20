//! Execution context of one top-level emulation.
//!
//! The [`Context`] is the state shared by every frame of a single emulation: the synthetic
//! call stack that `Thread.getStackTrace()` and `Throwable.getStackTrace()` report, the
//! provider chain that resolves calls, the class dictionary, the set of classes whose
//! static initializer already ran, the object heap, static field storage and the step
//! budget. Contexts are never shared between concurrent emulations.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use rustc_hash::{FxHashMap, FxHashSet};
use widestring::U16String;

use crate::{
    emulation::{EmulationError, EmulationLimits, Heap, JavaValue, ProviderChain},
    metadata::ClassDictionary,
    Result,
};

/// One entry of the synthetic call stack.
///
/// Mirrors what a `java.lang.StackTraceElement` exposes. The line number is the constant
/// pool size of the frame's class: decryption routines that key on
/// `getStackTrace()[n].getLineNumber()` expect exactly that value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Dotted class name (`a.b.C`)
    pub class_name: String,
    /// Method name
    pub method_name: String,
    /// Reported line number
    pub line_number: i32,
}

impl StackFrame {
    /// Creates a frame, converting an internal class name to dotted form.
    pub fn new(class_name: &str, method_name: &str, line_number: i32) -> Self {
        StackFrame {
            class_name: class_name.replace('/', "."),
            method_name: method_name.to_string(),
            line_number,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.class_name, self.method_name, self.line_number)
    }
}

/// Per-emulation state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use jvmscope::{emulation::{Context, ProviderChain}, metadata::ClassDictionary};
///
/// let dictionary = Arc::new(ClassDictionary::new());
/// let chain = Arc::new(ProviderChain::jdk(dictionary.clone())?);
/// let mut context = Context::new(chain, dictionary);
///
/// context.push("a/b/Caller", "run", 12)?;
/// context.push("a/b/Decrypter", "decrypt", 40)?;
/// assert_eq!(context.snapshot()[0].class_name, "a.b.Decrypter");
/// assert_eq!(context.pop()?.method_name, "decrypt");
/// # Ok::<(), jvmscope::Error>(())
/// ```
pub struct Context {
    frames: Vec<StackFrame>,
    provider: Arc<ProviderChain>,
    dictionary: Arc<ClassDictionary>,
    initialized: FxHashSet<String>,
    file: Option<PathBuf>,
    heap: Heap,
    statics: FxHashMap<(String, String), JavaValue>,
    limits: EmulationLimits,
    steps: u64,
}

impl Context {
    /// Creates a context with default limits.
    #[must_use]
    pub fn new(provider: Arc<ProviderChain>, dictionary: Arc<ClassDictionary>) -> Self {
        let limits = EmulationLimits::default();
        Context {
            frames: Vec::new(),
            provider,
            dictionary,
            initialized: FxHashSet::default(),
            file: None,
            heap: Heap::new(limits.max_heap_objects),
            statics: FxHashMap::default(),
            limits,
            steps: 0,
        }
    }

    /// Replaces the limits. The heap is recreated, so call this before executing anything.
    #[must_use]
    pub fn with_limits(mut self, limits: EmulationLimits) -> Self {
        self.heap = Heap::new(limits.max_heap_objects);
        self.limits = limits;
        self
    }

    /// Attaches the file the classes were loaded from.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Pushes a synthetic frame for `class_name.method_name`.
    ///
    /// # Errors
    /// Returns [`EmulationError::CallDepthExceeded`] when the call stack is full.
    pub fn push(&mut self, class_name: &str, method_name: &str, constant_pool_size: i32) -> Result<()> {
        if self.frames.len() >= self.limits.max_call_depth {
            return Err(EmulationError::CallDepthExceeded {
                depth: self.frames.len() + 1,
                limit: self.limits.max_call_depth,
            }
            .into());
        }
        self.frames
            .push(StackFrame::new(class_name, method_name, constant_pool_size));
        Ok(())
    }

    /// Pops the most recent frame.
    ///
    /// # Errors
    /// Returns [`EmulationError::CallStackUnderflow`] if no frame is present.
    pub fn pop(&mut self) -> Result<StackFrame> {
        self.frames
            .pop()
            .ok_or_else(|| EmulationError::CallStackUnderflow.into())
    }

    /// Frame `index` counted from the most recent one (0).
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&StackFrame> {
        self.frames.iter().rev().nth(index)
    }

    /// Number of frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Copy of the call stack, most recent frame first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StackFrame> {
        self.frames.iter().rev().cloned().collect()
    }

    /// The provider chain.
    #[must_use]
    pub fn provider(&self) -> &Arc<ProviderChain> {
        &self.provider
    }

    /// The class dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &Arc<ClassDictionary> {
        &self.dictionary
    }

    /// The originating file, if one was attached.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// The object heap.
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the object heap.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The active limits.
    #[must_use]
    pub fn limits(&self) -> &EmulationLimits {
        &self.limits
    }

    /// Instructions executed so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Charges one instruction against the budget.
    ///
    /// # Errors
    /// Returns [`EmulationError::InstructionLimitExceeded`] once the budget is spent.
    pub fn tick(&mut self) -> Result<()> {
        if self.limits.max_instructions != 0 && self.steps >= self.limits.max_instructions {
            return Err(EmulationError::InstructionLimitExceeded {
                executed: self.steps,
                limit: self.limits.max_instructions,
            }
            .into());
        }
        self.steps += 1;
        Ok(())
    }

    /// `true` if the static initializer of `class_name` was already triggered.
    #[must_use]
    pub fn is_class_initialized(&self, class_name: &str) -> bool {
        self.initialized.contains(class_name)
    }

    /// Marks `class_name` as initialized, returning `true` if it was not before.
    pub fn mark_class_initialized(&mut self, class_name: &str) -> bool {
        self.initialized.insert(class_name.to_string())
    }

    /// Reads a static field, `None` if it was never written.
    #[must_use]
    pub fn get_static(&self, owner: &str, name: &str) -> Option<JavaValue> {
        self.statics
            .get(&(owner.to_string(), name.to_string()))
            .copied()
    }

    /// Writes a static field.
    pub fn put_static(&mut self, owner: &str, name: &str, value: JavaValue) {
        self.statics
            .insert((owner.to_string(), name.to_string()), value);
    }

    /// Canonical string instance for `value`.
    ///
    /// # Errors
    /// Returns a budget fault when the heap is full.
    pub fn intern(&mut self, value: &U16String) -> Result<JavaValue> {
        self.heap.intern(value)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("frames", &self.frames)
            .field("initialized", &self.initialized)
            .field("file", &self.file)
            .field("heap_objects", &self.heap.len())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
