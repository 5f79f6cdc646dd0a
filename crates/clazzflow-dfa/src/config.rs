/// How abstract instances are told apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InstanceContext {
    /// One abstract instance per clazz.
    #[default]
    Clazz,
    /// One abstract instance per clazz and clazz of the creating call.
    CreatingClazz,
}

/// Analysis configuration.
#[derive(Clone, Debug)]
pub struct DfaConfig {
    max_iterations: Option<usize>,
    instance_context: InstanceContext,
    report_intrinsics: bool,
}

impl Default for DfaConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            instance_context: InstanceContext::default(),
            report_intrinsics: true,
        }
    }
}

impl DfaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort with [`DfaError::IterationLimit`](crate::DfaError::IterationLimit)
    /// if no fixpoint is reached after `n` sweeps.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_instance_context(mut self, context: InstanceContext) -> Self {
        self.instance_context = context;
        self
    }

    /// Whether calls to intrinsics without abstract semantics are reported.
    pub fn with_report_intrinsics(mut self, report: bool) -> Self {
        self.report_intrinsics = report;
        self
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    pub fn instance_context(&self) -> InstanceContext {
        self.instance_context
    }

    pub fn report_intrinsics(&self) -> bool {
        self.report_intrinsics
    }
}
