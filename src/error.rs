use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What the command-line front end was doing when something failed.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the source tree")]
    Source,
    #[display("could not open the upload target")]
    Store,
    #[display("catalog lookup failed")]
    Catalog,
    #[display("snapshot failed")]
    Snapshot,
    #[display("invalid archive timestamp")]
    Timestamp,
    #[display("could not write output")]
    Output,
}
