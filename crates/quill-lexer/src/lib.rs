//! Tokenizer for quill templates.
//!
//! Template text is split into literal text and tag bodies; tag bodies are
//! either handed to a tag-specific argument tokenizer or lexed as
//! expressions. The result is a [`TokenStream`] consumed by the parser.

pub mod cursor;
pub mod error;
pub mod expression;
pub mod stream;
pub mod token;
pub mod tokenizer;

pub use error::{SyntaxError, SyntaxErrorCode, SyntaxResult};
pub use expression::ExpressionLexer;
pub use stream::TokenStream;
pub use token::{Token, TokenKind};
pub use tokenizer::{
    split_top_level, ArgumentContext, ArgumentTokenizer, LexerOptions, TagTable, Tokenizer,
};
