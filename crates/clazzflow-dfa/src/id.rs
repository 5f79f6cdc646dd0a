use clazzflow_ir::identifier;

identifier! {
    /// An abstract object in the [`Store`](crate::Store).
    struct InstanceId => "instance"
}

identifier! {
    /// An abstract activation record in the [`Store`](crate::Store).
    struct CallId => "call"
}

identifier! {
    /// A node of the effect environment chain.
    struct EnvId => "env"
}

identifier! {
    /// An abstract raw array.
    struct ArrayId => "array"
}
