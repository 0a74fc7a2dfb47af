// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Fatal compile errors.
//!
//! Every variant indicates either a violated producer contract or an
//! exhausted preallocation; compilation is one-shot, so none of these are
//! recovered from.

use std::{
    convert::From,
    fmt::{self, Display},
};

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct CompileError {
    inner: Context<CompileErrorKind>,
}

impl CompileError {
    pub fn kind(&self) -> CompileErrorKind {
        self.inner.get_context().clone()
    }
}

impl From<CompileErrorKind> for CompileError {
    fn from(kind: CompileErrorKind) -> Self {
        CompileError {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<CompileErrorKind>> for CompileError {
    fn from(inner: Context<CompileErrorKind>) -> Self {
        CompileError { inner }
    }
}

impl Fail for CompileError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

#[derive(Clone, PartialEq, Debug, Fail)]
pub enum CompileErrorKind {
    #[fail(display = "Face with empty contents requested an edge")]
    BadContents,
    #[fail(display = "Plane normal is not unit length: {}", length)]
    InvalidNormal { length: f64 },
    #[fail(display = "Face grew past {} points while fixing tjunctions", limit)]
    SuperfaceOverflow { limit: usize },
    #[fail(display = "Face has {} edges, max {}", count, limit)]
    TooManyFaceEdges { count: usize, limit: usize },
    #[fail(display = "Weld edge pool exhausted ({} edges)", limit)]
    WeldEdgeOverflow { limit: usize },
    #[fail(display = "Weld vertex pool exhausted ({} vertices)", limit)]
    WeldVertOverflow { limit: usize },
}
