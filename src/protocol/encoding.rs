use thiserror::Error;

/// The destination buffer does not have the size the encoded value needs.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("buffer of {actual} bytes cannot hold {expected} encoded bytes")]
pub struct EncodingError {
    pub expected: usize,
    pub actual: usize,
}

impl EncodingError {
    pub(crate) fn check(expected: usize, into: &[u8]) -> Result<(), EncodingError> {
        if into.len() == expected {
            Ok(())
        } else {
            Err(EncodingError { expected, actual: into.len() })
        }
    }
}

pub trait Encodable {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError>;
}

#[macro_export]
macro_rules! one_byte_encodable_enum {
    ( $( $enum:ty ),* ) => {
        $(
            impl Encodable for $enum where $enum: OneByteEncodable {
                fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
                    EncodingError::check(1, into)?;
                    into[0] = self.encoded_as_byte();
                    Ok(into)
                }
            }
        )*
    }
}

pub trait OneByteEncodable {
    fn encoded_as_byte(&self) -> u8;
}

impl<T> Encodable for Option<T> where T: Encodable {
    fn encode<'a>(&self, into: &'a mut [u8]) -> Result<&'a [u8], EncodingError> {
        match self {
            Some(encodable) => encodable.encode(into),
            None => {
                for b in into.iter_mut() { *b = 0 }
                Ok(into)
            }
        }
    }
}
