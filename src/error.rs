use thiserror::Error;

/// Failures while declaring or looking up host types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeResolutionError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Property not found: {0}")]
    PropertyNotFound(String),
    #[error("Type already defined: {0}")]
    DuplicateType(String),
    #[error("Members of {0} are already defined")]
    MembersAlreadyDefined(String),
    #[error("Invalid definition of {name}: {reason}")]
    InvalidDefinition { name: String, reason: String },
}

/// Failures raised while a method body or a forwarding routine runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Unable to cast object of type '{actual}' to type '{expected}'")]
    InvalidCast { actual: String, expected: String },

    #[error("Object reference not set to an instance of an object")]
    NullReference,

    #[error("Attempt by '{caller}' to access '{member}' failed")]
    MethodAccess { caller: String, member: String },

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("'{member}' expects {expected} arguments, received {actual}")]
    ArgumentCount {
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot invoke abstract member '{0}'")]
    AbstractMember(String),

    #[error("{0}")]
    Exception(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Duck type creation failed: {0}")]
    Duck(Box<DuckTypeError>),
}

impl From<DuckTypeError> for RuntimeError {
    fn from(value: DuckTypeError) -> Self {
        RuntimeError::Duck(Box::new(value))
    }
}

/// Failures of adapter generation and of the factory entry points.
///
/// Generation failures are cached per (shape, target) pair and handed back
/// verbatim on every later request, hence `Clone`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DuckTypeError {
    #[error("The target instance can't be null")]
    ArgumentNull,

    #[error("The type '{0}' must be public")]
    TypeIsNotPublic(String),

    #[error("The type '{name}' is not a valid proxy definition: {reason}")]
    TypeIsNotValid { name: String, reason: String },

    #[error("The target method for the proxy method '{proxy}' was not found on '{target}'")]
    TargetMethodNotFound { proxy: String, target: String },

    #[error(
        "The target method for the proxy method '{proxy}' is ambiguous, candidates: '{first}' and '{second}'"
    )]
    TargetMethodAmbiguousMatch {
        proxy: String,
        first: String,
        second: String,
    },

    #[error("The property or field '{member}' was not found on '{target}'")]
    PropertyOrFieldNotFound { member: String, target: String },

    #[error("The property '{0}' must have the same number of index parameters as its target")]
    PropertyArgumentsLength(String),

    #[error("The property '{0}' can't be read, the target has no getter")]
    PropertyCantBeRead(String),

    #[error("The property '{0}' can't be written, the target has no setter")]
    PropertyCantBeWritten(String),

    #[error("The field '{0}' is marked as readonly and can't be written")]
    FieldIsReadonly(String),

    #[error("Members of the value type '{0}' can't be changed")]
    StructMembersCannotBeChanged(String),

    #[error("The parameter signature of '{proxy}' doesn't match '{target}': {reason}")]
    ParameterSignatureMismatch {
        proxy: String,
        target: String,
        reason: String,
    },

    #[error("The proxy method '{proxy}' is missing the parameter '{parameter}' required by '{target}'")]
    ProxyMethodParameterIsMissing {
        proxy: String,
        target: String,
        parameter: String,
    },

    #[error("The proxy method '{proxy}' returns a value but the target '{target}' returns void")]
    ReturnTypeMismatch { proxy: String, target: String },

    #[error("Invalid conversion from '{actual}' to '{expected}'")]
    InvalidTypeConversion { actual: String, expected: String },

    #[error(
        "The proxy method '{0}' is generic but its target can only be reached through a trampoline"
    )]
    GenericMethodNotSupportedInNonPublicInstance(String),

    #[error("The target method '{0}' is generic and its generic arguments can't be inferred")]
    TargetMethodGenericArgumentsMissing(String),

    #[error("Type resolution failed: {0}")]
    TypeResolution(#[from] TypeResolutionError),

    #[error("Runtime failure: {0}")]
    Runtime(#[from] RuntimeError),
}
