//! String decryption pass.
//!
//! For every method of every class, the pass asks the [`MethodAnalyzer`] which call
//! sites receive a constant-pool string, asks the [`Obfuscator`] which of those calls
//! are decryptor calls, and executes each decryptor with its literal in a fresh
//! [`Context`]. A successful call is folded: the `ldc` now loads the plaintext and the
//! call instruction is removed. A failed one is logged, recorded in the
//! [`DecryptionSummary`] and left untouched.
//!
//! # Stack Trace Emulation
//!
//! Allatori derives its key from the caller's class and method name and from the size of
//! the caller's constant pool, all read through `Thread.getStackTrace()`. Each attempt
//! therefore starts with one frame for the call site on the context before the
//! decryptor's own frame is pushed.
//!
//! # Parallelism
//!
//! Classes are independent: each worker rewrites only its own class and every attempt
//! owns its context. Decryptors always execute against the classes as they were before
//! the pass started.

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use widestring::U16String;

use crate::{
    analysis::{AnalyzerResult, FrameKind, MethodAnalyzer},
    assembly::{Constant, MethodBody, Operand},
    deobfuscation::{
        obfuscators::Obfuscator, CallSite, DecryptionConfig, DecryptionSummary, FailureReason,
    },
    emulation::{Context, JavaValue, MethodExecutor, ProviderChain},
    metadata::{ClassDictionary, ClassFile, ClassFileRc, MethodDef},
    Error, Result,
};

/// A decrypted call site, applied after the whole method was scanned.
#[derive(Debug)]
struct Rewrite {
    /// Index of the `ldc` feeding the call
    literal: usize,
    /// Index of the call
    call: usize,
    /// Plaintext
    value: U16String,
}

/// Replaces decryptor calls on string literals by their result.
pub struct DecryptionPass {
    obfuscator: Arc<dyn Obfuscator>,
    config: DecryptionConfig,
    summary: DecryptionSummary,
}

impl DecryptionPass {
    /// Creates a pass for the decryptors of `obfuscator`.
    #[must_use]
    pub fn new(obfuscator: Arc<dyn Obfuscator>, config: DecryptionConfig) -> Self {
        Self {
            obfuscator,
            config,
            summary: DecryptionSummary::new(),
        }
    }

    /// The pass name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        "decryption"
    }

    /// Results recorded so far.
    #[must_use]
    pub fn summary(&self) -> &DecryptionSummary {
        &self.summary
    }

    /// Consumes the pass, returning its results.
    #[must_use]
    pub fn into_summary(self) -> DecryptionSummary {
        self.summary
    }

    /// Runs the pass over `classes`, rewriting them in place.
    ///
    /// Returns the number of call sites decrypted by this run. Per-site failures are
    /// not errors: they are logged and recorded in the summary.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] for a zero step budget or if the provider
    /// chain cannot be built.
    pub fn run(&self, classes: &mut [ClassFile]) -> Result<usize> {
        if self.config.limits.max_instructions == 0 {
            return Err(Error::Configuration(
                "decryption requires a non-zero instruction budget".to_string(),
            ));
        }

        let dictionary: Arc<ClassDictionary> = Arc::new(classes.iter().cloned().collect());
        let chain = Arc::new(ProviderChain::jdk(Arc::clone(&dictionary))?);

        let process = |class: &mut ClassFile| self.process_class(class, &dictionary, &chain);
        let counts: Vec<usize> = if self.config.parallel {
            classes.par_iter_mut().map(process).collect::<Result<_>>()?
        } else {
            classes.iter_mut().map(process).collect::<Result<_>>()?
        };
        let decrypted = counts.iter().sum();

        info!(
            "{} string decryption: {} ({} this run)",
            self.obfuscator.name(),
            self.summary,
            decrypted
        );
        Ok(decrypted)
    }

    fn process_class(
        &self,
        class: &mut ClassFile,
        dictionary: &Arc<ClassDictionary>,
        chain: &Arc<ProviderChain>,
    ) -> Result<usize> {
        let mut decrypted = 0;
        for index in 0..class.methods.len() {
            let rewrites = self.scan_method(class, &class.methods[index], dictionary, chain);
            if rewrites.is_empty() {
                continue;
            }
            decrypted += rewrites.len();

            let Some(body) = class.methods[index].body.as_mut() else {
                continue;
            };
            Self::apply(body, rewrites)?;
        }
        Ok(decrypted)
    }

    /// Folds the literals first, then drops the calls from the highest index down.
    fn apply(body: &mut MethodBody, mut rewrites: Vec<Rewrite>) -> Result<()> {
        for rewrite in &mut rewrites {
            if let Some(instruction) = body.get_mut(rewrite.literal) {
                instruction.operand =
                    Operand::Constant(Constant::String(std::mem::take(&mut rewrite.value)));
            }
        }
        rewrites.sort_by(|left, right| right.call.cmp(&left.call));
        for rewrite in rewrites {
            body.remove(rewrite.call)?;
        }
        Ok(())
    }

    /// Finds and decrypts the decryptor calls of one method, without modifying it.
    fn scan_method(
        &self,
        class: &ClassFile,
        method: &MethodDef,
        dictionary: &Arc<ClassDictionary>,
        chain: &Arc<ProviderChain>,
    ) -> Vec<Rewrite> {
        let Some(body) = &method.body else {
            return Vec::new();
        };
        let analysis = match MethodAnalyzer::analyze(class, body) {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(
                    "Skipping {} {}{}: {}",
                    class.name, method.name, method.descriptor, error
                );
                return Vec::new();
            }
        };

        let mut rewrites = Vec::new();
        for (index, instruction) in body.iter().enumerate() {
            if !instruction.opcode.is_invoke() {
                continue;
            }
            let Operand::Method(member) = &instruction.operand else {
                continue;
            };
            if member.descriptor != self.config.decryptor_descriptor {
                continue;
            }
            let Some((decryptor_class, decryptor_index)) = self.obfuscator.decryptor(member, dictionary)
            else {
                continue;
            };
            let Some(arguments) = analysis.call_arguments(index) else {
                // unreachable call
                continue;
            };

            let decryptor = format!("{}.{}", member.owner, member.name);
            let site = CallSite::new(&class.name, &method.name, &method.descriptor, index);
            let (text, literal) = match arguments {
                [frame] => match &frame.kind {
                    FrameKind::Literal {
                        value: Constant::String(text),
                        source,
                    } => (text, *source),
                    _ => {
                        self.summary.record_skipped(&decryptor, site);
                        continue;
                    }
                },
                _ => {
                    self.summary.record_skipped(&decryptor, site);
                    continue;
                }
            };
            if Self::consumers(&analysis, literal) != 1 {
                warn!("Not decrypting {site}: the literal at {literal} has other consumers");
                self.summary
                    .record_failure(&decryptor, site, FailureReason::SharedLiteral);
                continue;
            }

            let Some(target) = decryptor_class.methods.get(decryptor_index) else {
                continue;
            };
            match self.decrypt(class, method, &decryptor_class, target, text, dictionary, chain) {
                Ok(Some(value)) => {
                    debug!(
                        "Decrypted {} via {}: {:?}",
                        site,
                        decryptor,
                        value.to_string_lossy()
                    );
                    self.summary
                        .record_success(&decryptor, site, value.to_string_lossy());
                    rewrites.push(Rewrite {
                        literal,
                        call: index,
                        value,
                    });
                }
                Ok(None) => {
                    warn!("Error while decrypting {site} via {decryptor}: no string returned");
                    self.summary
                        .record_failure(&decryptor, site, FailureReason::NonStringResult);
                }
                Err(error) => {
                    warn!("Error while decrypting {site} via {decryptor}: {error}");
                    self.summary
                        .record_failure(&decryptor, site, FailureReason::emulation(&error));
                }
            }
        }
        rewrites
    }

    /// Number of instructions that may consume the value pushed at `source`, including
    /// copies whose provenance was lost at a join or loop header.
    fn consumers(analysis: &AnalyzerResult, source: usize) -> usize {
        analysis
            .entries()
            .iter()
            .flatten()
            .filter(|entry| entry.consumed.iter().any(|frame| frame.may_come_from(source)))
            .count()
    }

    /// Runs one decryptor on one literal. `Ok(None)` if it returned `null` or a
    /// non-reference.
    #[allow(clippy::too_many_arguments)]
    fn decrypt(
        &self,
        caller: &ClassFile,
        caller_method: &MethodDef,
        decryptor_class: &ClassFileRc,
        decryptor: &MethodDef,
        literal: &U16String,
        dictionary: &Arc<ClassDictionary>,
        chain: &Arc<ProviderChain>,
    ) -> Result<Option<U16String>> {
        let mut context = Context::new(Arc::clone(chain), Arc::clone(dictionary))
            .with_limits(self.config.limits.clone());
        if let Some(file) = &self.config.file {
            context = context.with_file(file.clone());
        }
        context.push(
            &caller.name,
            &caller_method.name,
            i32::from(caller.constant_pool_size),
        )?;

        let input = context.intern(literal)?;
        let output = MethodExecutor::execute(decryptor_class, decryptor, vec![input], None, &mut context)?;
        match output {
            JavaValue::Reference(_) => Ok(Some(context.heap().string(output)?.clone())),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{InstructionAssembler, Opcode},
        deobfuscation::AllatoriObfuscator,
        emulation::{EmulationLimits, FaultKind},
        metadata::MethodAccessFlags,
    };

    const DECRYPT: &str = "(Ljava/lang/String;)Ljava/lang/String;";

    fn pass(limits: EmulationLimits) -> DecryptionPass {
        DecryptionPass::new(
            Arc::new(AllatoriObfuscator::new()),
            DecryptionConfig::default().with_limits(limits).with_parallel(false),
        )
    }

    fn trim_decryptor() -> ClassFile {
        let mut asm = InstructionAssembler::new();
        asm.aload(0)
            .invokevirtual("java/lang/String", "trim", "()Ljava/lang/String;")
            .areturn();
        ClassFile::new("a/K").with_method(MethodDef::new(
            "d",
            DECRYPT,
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            asm.finish().unwrap(),
        ))
    }

    fn caller(build: impl FnOnce(&mut InstructionAssembler)) -> ClassFile {
        let mut asm = InstructionAssembler::new();
        build(&mut asm);
        ClassFile::new("a/Main").with_method(MethodDef::new(
            "run",
            "()Ljava/lang/String;",
            MethodAccessFlags::STATIC,
            asm.finish().unwrap(),
        ))
    }

    fn body(classes: &[ClassFile]) -> &MethodBody {
        classes[1].methods[0].body.as_ref().unwrap()
    }

    #[test]
    fn test_literal_site_is_folded() {
        let mut classes = vec![
            trim_decryptor(),
            caller(|asm| {
                asm.ldc_string("  secret  ").invokestatic("a/K", "d", DECRYPT).areturn();
            }),
        ];
        let pass = pass(EmulationLimits::decryption());
        assert_eq!(pass.run(&mut classes).unwrap(), 1);

        let body = body(&classes);
        assert_eq!(body.len(), 2);
        assert_eq!(body.get(0).unwrap().constant(), Some(&Constant::string("secret")));
        assert_eq!(body.get(1).unwrap().opcode, Opcode::Areturn);
        assert_eq!(pass.summary().decrypted_for("a/K.d")[0].value, "secret");
        assert_eq!(pass.summary().removable_decryptors(), vec!["a/K.d".to_string()]);
    }

    #[test]
    fn test_non_literal_site_untouched() {
        let mut classes = vec![
            trim_decryptor(),
            caller(|asm| {
                asm.ldc_string("a")
                    .invokevirtual("java/lang/String", "trim", "()Ljava/lang/String;")
                    .invokestatic("a/K", "d", DECRYPT)
                    .areturn();
            }),
        ];
        let before = classes.clone();
        let pass = pass(EmulationLimits::decryption());
        assert_eq!(pass.run(&mut classes).unwrap(), 0);
        assert_eq!(classes, before);
        assert_eq!(pass.summary().skipped_count(), 1);
    }

    #[test]
    fn test_failure_is_recorded_and_pass_continues() {
        let mut broken = InstructionAssembler::new();
        broken
            .aload(0)
            .invokestatic("a/Missing", "native", DECRYPT)
            .areturn();
        let decryptors = trim_decryptor().with_method(MethodDef::new(
            "broken",
            DECRYPT,
            MethodAccessFlags::STATIC,
            broken.finish().unwrap(),
        ));
        let mut classes = vec![
            decryptors,
            caller(|asm| {
                asm.ldc_string("x")
                    .invokestatic("a/K", "broken", DECRYPT)
                    .op(Opcode::Pop)
                    .ldc_string(" y ")
                    .invokestatic("a/K", "d", DECRYPT)
                    .areturn();
            }),
        ];
        let pass = pass(EmulationLimits::decryption());
        assert_eq!(pass.run(&mut classes).unwrap(), 1);

        let body = body(&classes);
        // the failed call stays, the successful one is folded
        assert_eq!(body.len(), 5);
        assert_eq!(body.get(1).unwrap().opcode, Opcode::Invokestatic);
        assert_eq!(body.get(3).unwrap().constant(), Some(&Constant::string("y")));

        let failures = pass.summary().failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "a/K.broken");
        assert!(matches!(
            failures[0].1.reason,
            FailureReason::EmulationFailed {
                kind: Some(FaultKind::UnresolvedMember),
                ..
            }
        ));
    }

    #[test]
    fn test_step_budget_stops_spinning_decryptor() {
        let mut spin = InstructionAssembler::new();
        spin.label("top").goto("top");
        let decryptor = ClassFile::new("a/K").with_method(MethodDef::new(
            "d",
            DECRYPT,
            MethodAccessFlags::STATIC,
            spin.finish().unwrap(),
        ));
        let mut classes = vec![
            decryptor,
            caller(|asm| {
                asm.ldc_string("x").invokestatic("a/K", "d", DECRYPT).areturn();
            }),
        ];
        let pass = pass(EmulationLimits::new().with_max_instructions(10_000));
        assert_eq!(pass.run(&mut classes).unwrap(), 0);
        assert_eq!(body(&classes).len(), 3);
        assert!(matches!(
            pass.summary().failures()[0].1.reason,
            FailureReason::EmulationFailed {
                kind: Some(FaultKind::StepBudget),
                ..
            }
        ));
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let mut classes = vec![trim_decryptor()];
        let error = pass(EmulationLimits::new().with_max_instructions(0))
            .run(&mut classes)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn test_shared_literal_is_not_folded() {
        let mut classes = vec![
            trim_decryptor(),
            caller(|asm| {
                asm.ldc_string(" k ")
                    .op(Opcode::Dup)
                    .invokestatic("a/K", "d", DECRYPT)
                    .op(Opcode::Pop)
                    .areturn();
            }),
        ];
        let pass = pass(EmulationLimits::decryption());
        assert_eq!(pass.run(&mut classes).unwrap(), 0);
        assert_eq!(pass.summary().failures()[0].1.reason, FailureReason::SharedLiteral);
    }

    #[test]
    fn test_literal_copy_through_loop_is_not_folded() {
        // the dup-ed copy reaches a loop header before it is stored and returned
        let build = |asm: &mut InstructionAssembler| {
            asm.ldc_string("  c  ")
                .op(Opcode::Dup)
                .invokestatic("a/K", "d", DECRYPT)
                .op(Opcode::Pop)
                .label("loop")
                .op(Opcode::Dup)
                .astore(1)
                .iconst(0)
                .jump(Opcode::Ifne, "loop")
                .op(Opcode::Pop)
                .aload(1)
                .areturn();
        };
        let mut classes = vec![trim_decryptor(), caller(build)];
        let before = classes.clone();

        let pass = pass(EmulationLimits::decryption());
        assert_eq!(pass.run(&mut classes).unwrap(), 0);
        assert_eq!(classes, before);
        assert_eq!(body(&classes).get(0).unwrap().constant(), Some(&Constant::string("  c  ")));
        assert_eq!(pass.summary().failures()[0].1.reason, FailureReason::SharedLiteral);
    }
}
