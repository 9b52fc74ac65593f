use std::{borrow::Cow, fmt};

use wax_error::BoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Category of a [`JoseError`].
///
/// Failures of the underlying primitives are normalized into these kinds,
/// the primitive error types themselves never leave this crate.
pub enum JoseErrorKind {
    /// Algorithm name unknown to the registry, or known but not implemented.
    UnsupportedAlgorithm,
    /// Key type, length or algorithm tag does not fit the algorithm.
    InvalidKeyMaterial,
    /// Caller supplied parameter is out of bounds (e.g. an IV of the wrong length).
    InvalidInput,
    /// Tag, MAC, signature or key unwrap check failed.
    AuthenticationFailure,
    /// Base64url or JSON structure violation in a wire form.
    MalformedEncoding,
    /// Unrecognized critical extension, or a serialization that cannot
    /// represent the object (e.g. compact form with two signatures).
    PolicyViolation,
}

impl fmt::Display for JoseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedAlgorithm => "unsupported algorithm",
            Self::InvalidKeyMaterial => "invalid key material",
            Self::InvalidInput => "invalid input",
            Self::AuthenticationFailure => "authentication failed",
            Self::MalformedEncoding => "malformed encoding",
            Self::PolicyViolation => "policy violation",
        })
    }
}

/// Error returned by every JOSE operation.
///
/// An [`JoseErrorKind::AuthenticationFailure`] never carries a message or a source,
/// so it reads the same regardless of which check rejected the input.
pub struct JoseError {
    kind: JoseErrorKind,
    message: Option<Cow<'static, str>>,
    source: Option<BoxError>,
}

impl JoseError {
    fn with_kind(kind: JoseErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            source: None,
        }
    }

    /// Create a [`JoseErrorKind::UnsupportedAlgorithm`] error.
    pub fn unsupported_algorithm(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(JoseErrorKind::UnsupportedAlgorithm, message)
    }

    /// Create a [`JoseErrorKind::InvalidKeyMaterial`] error.
    pub fn invalid_key_material(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(JoseErrorKind::InvalidKeyMaterial, message)
    }

    /// Create a [`JoseErrorKind::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(JoseErrorKind::InvalidInput, message)
    }

    /// Create a [`JoseErrorKind::MalformedEncoding`] error.
    pub fn malformed_encoding(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(JoseErrorKind::MalformedEncoding, message)
    }

    /// Create a [`JoseErrorKind::PolicyViolation`] error.
    pub fn policy_violation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(JoseErrorKind::PolicyViolation, message)
    }

    /// Create the one and only [`JoseErrorKind::AuthenticationFailure`] error.
    pub fn authentication_failure() -> Self {
        Self {
            kind: JoseErrorKind::AuthenticationFailure,
            message: None,
            source: None,
        }
    }

    /// Wrap a foreign error as the given kind.
    ///
    /// If the error already is a [`JoseError`] it is returned as is.
    /// Authentication failures drop the foreign error.
    pub fn from_boxed(kind: JoseErrorKind, error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(error) => *error,
            Err(_) if kind == JoseErrorKind::AuthenticationFailure => Self::authentication_failure(),
            Err(error) => Self {
                kind,
                message: None,
                source: Some(error),
            },
        }
    }

    #[must_use]
    /// Attach the error which caused this one.
    ///
    /// Ignored for [`JoseErrorKind::AuthenticationFailure`].
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        if self.kind != JoseErrorKind::AuthenticationFailure {
            self.source = Some(source.into());
        }
        self
    }

    /// The [`JoseErrorKind`] of this error.
    pub fn kind(&self) -> JoseErrorKind {
        self.kind
    }

    /// `true` if this error is of the given kind.
    pub fn is(&self, kind: JoseErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for JoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoseError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for JoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.source) {
            (Some(message), _) => write!(f, "{}: {message}", self.kind),
            (None, Some(source)) => write!(f, "{}: {source}", self.kind),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for JoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wax_error::{ErrorContext, ErrorExt};

    #[test]
    fn authentication_failure_is_opaque() {
        let error = JoseError::authentication_failure().with_source(
            "abc".parse::<u8>().context("padding").unwrap_err(),
        );
        assert_eq!(error.to_string(), "authentication failed");
        assert!(std::error::Error::source(&error).is_none());
    }

    #[test]
    fn from_boxed_keeps_jose_kind() {
        let boxed: BoxError = Box::new(JoseError::policy_violation("crit"));
        let error = JoseError::from_boxed(JoseErrorKind::InvalidKeyMaterial, boxed);
        assert!(error.is(JoseErrorKind::PolicyViolation));
    }

    #[test]
    fn source_is_part_of_chain() {
        let error = JoseError::malformed_encoding("decode iv segment")
            .with_source("x".parse::<u32>().context("parse length").unwrap_err());
        assert_eq!(error.chain().count(), 3);
        assert!(error.root_cause().is::<std::num::ParseIntError>());
        assert_eq!(error.to_string(), "malformed encoding: decode iv segment");
    }
}
