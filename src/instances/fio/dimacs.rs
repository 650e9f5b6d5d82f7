//! # Parsing (W)DIMACS Files
//!
//! Reads CNF and pre-2022 WCNF files into a [`MaxSatSolver`] session. The
//! approach is to accept input instances, even if they are not technically in
//! spec, as long as the input is still reasonable.
//!
//! - `p cnf <vars> <clauses>`: every clause is a soft clause with weight 1,
//!   the session solves the MaxSAT version of the CNF.
//! - `p wcnf <vars> <clauses> [<top>]`: every clause line starts with a
//!   weight. Clauses with a weight of at least `top` are hard, clauses with
//!   weight 0 are skipped, all others are soft.
//!
//! The header has to appear exactly once, before the first clause. A clause
//! count that differs from the header only produces a warning.
//!
//! ## References
//!
//! - [DIMACS CNF](http://www.satcompetition.org/2011/format-benchmarks2011.html)
//! - [DIMACS WCNF pre22](https://maxsat-evaluations.github.io/2017/rules.html#input)

use std::{
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use log::{debug, warn};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{i32, line_ending, multispace0, multispace1, u64},
    combinator::{all_consuming, map_res, opt, recognize, success},
    error::{Error as NomError, ErrorKind, ParseError},
    multi::separated_list0,
    sequence::{pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::session::{MaxSatSolver, Options};

/// Errors occuring within the DIMACS parsing module
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid literal in the file
    #[error("invalid literal: {0}")]
    Lit(String),
    /// Invalid ending of a clause
    #[error("invalid clause ending: {0}")]
    ClauseEnding(String),
    /// Invalid weight
    #[error("invalid weight: {0}")]
    Weight(String),
    /// The file ended before a p line was found
    #[error("preamble never ends")]
    PreambleNoEnd,
    /// A clause appeared before the p line
    #[error("line {0}: clause before the p-line")]
    NoHeader(usize),
    /// A second p line
    #[error("line {0}: found two p-lines")]
    DuplicateHeader(usize),
    /// P line value is too large
    #[error("value in p-line too large: {0}")]
    PValTooLarge(u64),
    /// Invalid p line
    #[error("invalid p-line: {0}")]
    PLine(String),
    /// The session rejected a clause
    #[error("line {line}: failure while adding clause, error number {errno}")]
    Rejected {
        /// The line of the clause
        line: usize,
        /// The error code of the session
        errno: i32,
    },
    /// IO error reading file
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    /// Base error from nom parsing
    #[error("nom error: {0} ({1:?})")]
    NomError(String, ErrorKind),
    /// Incomplete nom error
    #[error("nom parser requested more data")]
    NomIncomplete,
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Lit(l0), Self::Lit(r0))
            | (Self::ClauseEnding(l0), Self::ClauseEnding(r0))
            | (Self::Weight(l0), Self::Weight(r0))
            | (Self::PLine(l0), Self::PLine(r0)) => l0 == r0,
            (Self::NoHeader(l0), Self::NoHeader(r0))
            | (Self::DuplicateHeader(l0), Self::DuplicateHeader(r0)) => l0 == r0,
            (Self::PValTooLarge(l0), Self::PValTooLarge(r0)) => l0 == r0,
            (
                Self::Rejected {
                    line: l0,
                    errno: l1,
                },
                Self::Rejected {
                    line: r0,
                    errno: r1,
                },
            ) => l0 == r0 && l1 == r1,
            (Self::NomError(l0, l1), Self::NomError(r0, r1)) => l0 == r0 && l1 == r1,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl ParseError<&str> for Error {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        Self::NomError(String::from(input), kind)
    }

    fn append(_: &str, _: ErrorKind, other: Self) -> Self {
        // Other error always has precedence. This should prefer more meaningful
        // errors than [`Error::NomError`]
        other
    }
}

/// A parsed input file
#[derive(Debug)]
pub struct Instance {
    /// The session holding the clauses of the file
    pub solver: MaxSatSolver,
    /// The top weight of a WCNF file, [`None`] for CNF files
    pub top: Option<u64>,
}

impl Instance {
    /// The maximum cost to solve the instance with: a solution has to be
    /// cheaper than the top weight
    #[must_use]
    pub fn max_cost(&self) -> u64 {
        self.top.unwrap_or(u64::MAX)
    }
}

/// Internal type of file formats
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Format {
    Cnf,
    Wcnf { top: Option<u64> },
}

/// Internal type of p line contents
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct Header {
    n_vars: u32,
    n_clauses: usize,
    format: Format,
}

/// Parses a (W)DIMACS file at a path. With feature `compression`, `.gz`,
/// `.bz2` and `.xz` files are decompressed.
///
/// # Errors
///
/// If the file cannot be read, is malformed, or the session rejects a clause.
pub fn parse_wdimacs_path<P: AsRef<Path>>(path: P, options: Options) -> Result<Instance, Error> {
    let reader = super::open_compressed_uncompressed_read(path)?;
    parse_wdimacs(reader, options)
}

/// Parses a (W)DIMACS file from a reader into a new session created with
/// `options`
///
/// # Errors
///
/// If reading fails, the input is malformed, or the session rejects a
/// clause.
pub fn parse_wdimacs<R: Read>(reader: R, options: Options) -> Result<Instance, Error> {
    let mut reader = BufReader::new(reader);
    let mut state: Option<(Instance, Header)> = None;
    let mut n_read = 0;
    let mut line_num = 0;
    let mut buf = String::new();
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        line_num += 1;
        let line = buf.trim_start();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        if line.starts_with('p') {
            if state.is_some() {
                return Err(Error::DuplicateHeader(line_num));
            }
            let (_, header) = parse_p_line(line).map_err(unwrap_dimacs_error)?;
            debug!("p-line: {header:?}");
            let top = match header.format {
                Format::Cnf => None,
                Format::Wcnf { top } => top,
            };
            let solver = MaxSatSolver::with_options(header.n_vars, header.n_clauses, options);
            state = Some((Instance { solver, top }, header));
            continue;
        }
        let Some((instance, header)) = &mut state else {
            return Err(Error::NoHeader(line_num));
        };
        n_read += 1;
        let (weight, lits) = match header.format {
            Format::Cnf => {
                let (_, lits) = parse_clause(line).map_err(unwrap_dimacs_error)?;
                (1, lits)
            }
            Format::Wcnf { top } => {
                let (_, (weight, lits)) = parse_wclause(line).map_err(unwrap_dimacs_error)?;
                if top.is_some_and(|top| weight >= top) {
                    (0, lits)
                } else if weight == 0 {
                    debug!("line {line_num}: skipping clause with weight 0");
                    continue;
                } else {
                    (weight, lits)
                }
            }
        };
        if !instance.solver.add_clause(&lits, weight) {
            return Err(Error::Rejected {
                line: line_num,
                errno: instance.solver.errno(),
            });
        }
    }
    let Some((instance, header)) = state else {
        return Err(Error::PreambleNoEnd);
    };
    if n_read != header.n_clauses {
        warn!(
            "header mismatch: {} clauses declared, {n_read} found",
            header.n_clauses
        );
    }
    Ok(instance)
}

fn unwrap_dimacs_error(err: nom::Err<Error>) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::NomIncomplete,
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
    }
}

/// Parses the p line
fn parse_p_line(input: &str) -> IResult<&str, Header, Error> {
    let full_p_line = String::from(input.trim_end());
    let (input, _) = terminated::<_, _, _, NomError<_>, _, _>(tag("p"), multispace1)(input)
        .map_err(|e| e.map(|_| Error::PLine(full_p_line.clone())))?;
    let (input, id_token) = alt((
        terminated::<_, _, _, NomError<_>, _, _>(tag("cnf"), multispace1),
        terminated(tag("wcnf"), multispace1),
    ))(input)
    .map_err(|e| e.map(|_| Error::PLine(full_p_line.clone())))?;
    let (input, (n_vars, _, n_clauses)) =
        tuple::<_, _, NomError<_>, _>((u64, multispace1, u64))(input)
            .map_err(|e| e.map(|_| Error::PLine(full_p_line.clone())))?;
    let Ok(n_vars) = u32::try_from(n_vars) else {
        return Err(nom::Err::Error(Error::PValTooLarge(n_vars)));
    };
    let Ok(n_clauses) = usize::try_from(n_clauses) else {
        return Err(nom::Err::Error(Error::PValTooLarge(n_clauses)));
    };
    if id_token == "cnf" {
        return Ok((
            input,
            Header {
                n_vars,
                n_clauses,
                format: Format::Cnf,
            },
        ));
    }
    let (input, top) = opt(preceded::<_, _, _, NomError<_>, _, _>(multispace1, u64))(input)
        .map_err(|e| e.map(|_| Error::PLine(full_p_line)))?;
    Ok((
        input,
        Header {
            n_vars,
            n_clauses,
            format: Format::Wcnf { top },
        },
    ))
}

/// Parses a clause line
fn parse_clause(input: &str) -> IResult<&str, Vec<i32>, Error> {
    terminated(separated_list0(multispace1, parse_lit), parse_clause_ending)(input)
}

/// Parses a weighted clause line
fn parse_wclause(input: &str) -> IResult<&str, (u64, Vec<i32>), Error> {
    separated_pair(parse_weight, multispace1, parse_clause)(input)
}

/// Nuclear parser for weight value
fn parse_weight(input: &str) -> IResult<&str, u64, Error> {
    u64(input).map_err(|e| e.map(|e: NomError<&str>| Error::Weight(String::from(e.input))))
}

/// Nuclear parser for literal
fn parse_lit(input: &str) -> IResult<&str, i32, Error> {
    map_res(i32, |lit| if lit == 0 { Err(()) } else { Ok(lit) })(input)
        .map_err(|e| e.map(|e: NomError<&str>| Error::Lit(String::from(e.input))))
}

/// Parses the end of a clause
/// A '0' followed by a linebreak, as well as a '0' followed by
/// whitespace or only a linebreak are treated as valid clause endings.
/// This is more lean than the file format spec.
fn parse_clause_ending(input: &str) -> IResult<&str, &str, Error> {
    recognize(pair(
        multispace0,
        alt((
            recognize(all_consuming(success(""))),
            recognize(all_consuming(tag("0"))),
            recognize(terminated(tag("0"), line_ending)),
            recognize(terminated(tag("0"), multispace1)),
            recognize(line_ending),
        )),
    ))(input)
    .map_err(|e| e.map(|e: NomError<&str>| Error::ClauseEnding(String::from(e.input))))
}
