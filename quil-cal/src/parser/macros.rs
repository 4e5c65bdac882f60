// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Build a parser which consumes exactly one token of the given variant.
///
/// * `token!(Colon)` matches a unit variant and returns `()`.
/// * `token!(Command(ReservedKeyword::Pulse))` matches a variant holding a specific value and
///   returns `()`. The enum must be in scope at the call site.
/// * `token!(Identifier(v))` matches any value of the variant and returns a clone of it.
///
/// The returned closure borrows the lifetime `'a` from the enclosing function.
macro_rules! token {
    ($expected_variant: ident($enm:ident::$variant:ident)) => {{
        move |input: $crate::parser::ParserInput<'a>| match $crate::parser::split_first_token(
            input,
        ) {
            Some(($crate::parser::Token::$expected_variant($enm::$variant), remainder)) => {
                Ok((remainder, ()))
            }
            _ => $crate::parser::expected(input, stringify!($variant)),
        }
    }};
    ($expected_variant: ident($contents: ident)) => {{
        move |input: $crate::parser::ParserInput<'a>| match $crate::parser::split_first_token(
            input,
        ) {
            Some(($crate::parser::Token::$expected_variant($contents), remainder)) => {
                Ok((remainder, $contents.clone()))
            }
            _ => $crate::parser::expected(input, stringify!($expected_variant)),
        }
    }};
    ($expected_variant: ident) => {{
        move |input: $crate::parser::ParserInput<'a>| match $crate::parser::split_first_token(
            input,
        ) {
            Some(($crate::parser::Token::$expected_variant, remainder)) => Ok((remainder, ())),
            _ => $crate::parser::expected(input, stringify!($expected_variant)),
        }
    }};
}

pub(crate) use token;

/// Define a test which lexes `$input`, runs `$parser` over every token and compares the result.
#[cfg(test)]
macro_rules! make_test {
    ($name: ident, $parser: ident, $input: expr, $expected: expr) => {
        #[test]
        fn $name() {
            let tokens = $crate::parser::lexer::lex($input).unwrap();
            let (remainder, parsed) = $parser(&tokens).unwrap();
            assert_eq!(
                remainder
                    .iter()
                    .map($crate::parser::TokenWithLocation::as_token)
                    .collect::<Vec<_>>(),
                vec![&$crate::parser::Token::NewLine],
                "tokens left over"
            );
            assert_eq!(parsed, $expected);
        }
    };
}

#[cfg(test)]
pub(crate) use make_test;
