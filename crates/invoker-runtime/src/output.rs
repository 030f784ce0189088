use crate::error::FunctionError;
use bytes::Bytes;

/// Payload written when neither the function nor a plugin produced one
pub const DEFAULT_OUTPUT_DATA: &[u8] = b"Success";

pub const STATUS_OK: u16 = 200;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Normalized result of a single invocation.
///
/// Written by handlers and plugins, completed by [`Output::apply_defaults`]
/// and read once by the runtime to produce the transport response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    code: Option<u16>,
    data: Option<Bytes>,
    error: Option<FunctionError>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output carrying only a functional error
    pub fn from_error(error: FunctionError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_error(mut self, error: FunctionError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&FunctionError> {
        self.error.as_ref()
    }

    pub fn set_code(&mut self, code: u16) {
        self.code = Some(code);
    }

    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = Some(data.into());
    }

    pub fn set_error(&mut self, error: Option<FunctionError>) {
        self.error = error;
    }

    /// Fill the fields the invocation left unset.
    ///
    /// A missing payload becomes [`DEFAULT_OUTPUT_DATA`]. A missing code
    /// becomes `preserved_status` when the transport already carries a status
    /// chosen by the function, otherwise 500 or 200 depending on whether an
    /// error was recorded. Fields that are already set are never touched.
    pub fn apply_defaults(&mut self, preserved_status: Option<u16>) {
        if self.data.is_none() {
            self.data = Some(Bytes::from_static(DEFAULT_OUTPUT_DATA));
        }

        if self.code.is_none() {
            let code = match preserved_status {
                Some(status) => status,
                None if self.error.is_some() => STATUS_INTERNAL_ERROR,
                None => STATUS_OK,
            };
            self.code = Some(code);
        }
    }

    /// Status of a transport that carries no status chosen by the function:
    /// 500 when an error is recorded, 200 otherwise. An explicit `code` does
    /// not take part.
    pub fn outcome_status(&self) -> u16 {
        if self.error.is_some() {
            STATUS_INTERNAL_ERROR
        } else {
            STATUS_OK
        }
    }

    /// Outcome status and payload
    pub(crate) fn into_outcome(self) -> (u16, Bytes) {
        let status = self.outcome_status();
        (
            status,
            self.data
                .unwrap_or_else(|| Bytes::from_static(DEFAULT_OUTPUT_DATA)),
        )
    }

    pub(crate) fn into_parts(self) -> (u16, Bytes) {
        (
            self.code.unwrap_or(STATUS_OK),
            self.data
                .unwrap_or_else(|| Bytes::from_static(DEFAULT_OUTPUT_DATA)),
        )
    }
}
