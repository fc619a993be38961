use crate::bindings::Bindings;
use crate::error::ParseError;
use asym_ast::{Context, Expr, ExprId};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, one_of},
    combinator::{map, opt},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use num_bigint::BigInt;
use num_rational::BigRational;

/// Deepest nesting accepted before parsing is refused: parentheses, and
/// separately the length of power chains along any path (`2^n^n^...`).
pub const MAX_NESTING: usize = 256;

/// Largest decimal exponent of a literal such as `1e5`.
pub const MAX_LITERAL_EXPONENT: u32 = 1_000;

#[derive(Debug, Clone, Copy)]
enum AddOp {
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy)]
enum MulOp {
    Mul,
    Div,
}

// Intermediate tree; names are resolved against the bindings when lowering.
// Sums, products and power chains are kept flat so that long inputs never
// recurse per operand.
#[derive(Debug, Clone)]
enum ParseNode {
    Number(BigRational),
    Identifier(String),
    Sum(Box<ParseNode>, Vec<(AddOp, ParseNode)>),
    Product(Box<ParseNode>, Vec<(MulOp, ParseNode)>),
    /// `base ^ e1 ^ e2 ...`, right associative; each exponent may carry a
    /// leading minus.
    Power(Box<ParseNode>, Vec<(bool, ParseNode)>),
    Neg(Box<ParseNode>),
    Function(String, Vec<ParseNode>),
}

impl ParseNode {
    fn lower(self, ctx: &mut Context, bindings: &Bindings) -> Result<ExprId, ParseError> {
        let id = match self {
            ParseNode::Number(n) => ctx.add(Expr::Number(n)),
            ParseNode::Identifier(name) => {
                if bindings.is_variable(&name) {
                    ctx.var(&name)
                } else if let Some(c) = bindings.constant(&name) {
                    ctx.constant(c)
                } else {
                    return Err(ParseError::UnknownSymbol(name));
                }
            }
            ParseNode::Sum(first, rest) => {
                let mut acc = first.lower(ctx, bindings)?;
                for (op, node) in rest {
                    let rid = node.lower(ctx, bindings)?;
                    acc = ctx.add(match op {
                        AddOp::Add => Expr::Add(acc, rid),
                        AddOp::Sub => Expr::Sub(acc, rid),
                    });
                }
                acc
            }
            ParseNode::Product(first, rest) => {
                let mut acc = first.lower(ctx, bindings)?;
                for (op, node) in rest {
                    let rid = node.lower(ctx, bindings)?;
                    acc = ctx.add(match op {
                        MulOp::Mul => Expr::Mul(acc, rid),
                        MulOp::Div => Expr::Div(acc, rid),
                    });
                }
                acc
            }
            ParseNode::Power(base, chain) => {
                let bid = base.lower(ctx, bindings)?;
                let mut exponents = Vec::with_capacity(chain.len());
                for (negated, node) in chain {
                    exponents.push((negated, node.lower(ctx, bindings)?));
                }
                let mut acc: Option<ExprId> = None;
                for (negated, id) in exponents.into_iter().rev() {
                    let mut e = match acc {
                        Some(exp) => ctx.add(Expr::Pow(id, exp)),
                        None => id,
                    };
                    if negated {
                        e = ctx.add(Expr::Neg(e));
                    }
                    acc = Some(e);
                }
                match acc {
                    Some(exp) => ctx.add(Expr::Pow(bid, exp)),
                    None => bid,
                }
            }
            ParseNode::Neg(e) => {
                let eid = e.lower(ctx, bindings)?;
                ctx.add(Expr::Neg(eid))
            }
            ParseNode::Function(name, args) => {
                bindings.check_call(&name, args.len())?;
                let arg_ids = args
                    .into_iter()
                    .map(|a| a.lower(ctx, bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                ctx.call(&name, arg_ids)
            }
        };
        Ok(id)
    }

    /// Longest run of chained powers along any path from the root.
    fn power_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match node {
                ParseNode::Number(_) | ParseNode::Identifier(_) => {}
                ParseNode::Sum(first, rest) => {
                    stack.push((first.as_ref(), depth));
                    stack.extend(rest.iter().map(|(_, n)| (n, depth)));
                }
                ParseNode::Product(first, rest) => {
                    stack.push((first.as_ref(), depth));
                    stack.extend(rest.iter().map(|(_, n)| (n, depth)));
                }
                ParseNode::Power(base, chain) => {
                    let inner = depth + chain.len();
                    deepest = deepest.max(inner);
                    stack.push((base.as_ref(), inner));
                    stack.extend(chain.iter().map(|(_, n)| (n, inner)));
                }
                ParseNode::Neg(e) => stack.push((e.as_ref(), depth)),
                ParseNode::Function(_, args) => stack.extend(args.iter().map(|a| (a, depth))),
            }
        }
        deepest
    }
}

/// Convert a decimal string to BigRational.
/// Supports: "8.2" → 41/5, ".5" → 1/2, "8." → 8, "123" → 123
fn decimal_to_rational(integer_part: &str, fractional_part: &str) -> BigRational {
    let int_val: BigInt = if integer_part.is_empty() {
        BigInt::from(0)
    } else {
        integer_part.parse().unwrap_or_else(|_| BigInt::from(0))
    };

    if fractional_part.is_empty() {
        return BigRational::from_integer(int_val);
    }

    let denominator = num_traits::pow(BigInt::from(10), fractional_part.len());
    let frac_val: BigInt = fractional_part.parse().unwrap_or_else(|_| BigInt::from(0));

    BigRational::new(int_val * &denominator + frac_val, denominator)
}

// Decimal exponent of a literal: e5, E-3, e+2. Only taken when digits follow,
// so `2e` stays `2 * e`.
fn parse_literal_exponent(input: &str) -> IResult<&str, (Option<char>, &str)> {
    preceded(
        one_of("eE"),
        pair(opt(one_of("+-")), take_while1(|c: char| c.is_ascii_digit())),
    )(input)
}

// Numeric literals: 123, 8.2, .5, 8., 1e5, 2.5E-3
fn parse_number(input: &str) -> IResult<&str, ParseNode> {
    let (remaining, (int_str, maybe_frac, maybe_exp)) = tuple((
        take_while(|c: char| c.is_ascii_digit()),
        opt(pair(tag("."), take_while(|c: char| c.is_ascii_digit()))),
        opt(parse_literal_exponent),
    ))(input)?;

    let frac_str = maybe_frac.map(|(_, frac)| frac).unwrap_or("");

    if int_str.is_empty() && frac_str.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    let mut value = decimal_to_rational(int_str, frac_str);
    if let Some((sign, digits)) = maybe_exp {
        let exponent = digits
            .parse::<u32>()
            .ok()
            .filter(|e| *e <= MAX_LITERAL_EXPONENT)
            .ok_or_else(|| {
                nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::TooLarge,
                ))
            })?;
        let scale = BigRational::from_integer(num_traits::pow(BigInt::from(10), exponent as usize));
        value = if sign == Some('-') {
            value / scale
        } else {
            value * scale
        };
    }

    Ok((remaining, ParseNode::Number(value)))
}

// Identifiers start with a letter (any script, so `π` qualifies) or underscore,
// then continue with letters, digits, underscores.
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Alpha,
            )))
        }
    }

    let len = input
        .char_indices()
        .skip(1)
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(input.len());

    Ok((&input[len..], &input[..len]))
}

fn parse_variable(input: &str) -> IResult<&str, ParseNode> {
    map(parse_identifier, |s: &str| ParseNode::Identifier(s.to_string()))(input)
}

fn parse_parens(input: &str) -> IResult<&str, ParseNode> {
    delimited(
        preceded(multispace0, tag("(")),
        parse_expr,
        preceded(multispace0, tag(")")),
    )(input)
}

fn parse_function(input: &str) -> IResult<&str, ParseNode> {
    let (input, name) = parse_identifier(input)?;
    let (input, _) = preceded(multispace0, tag("("))(input)?;
    let (input, args) = separated_list0(preceded(multispace0, tag(",")), parse_expr)(input)?;
    let (input, _) = preceded(multispace0, tag(")"))(input)?;

    Ok((input, ParseNode::Function(name.to_string(), args)))
}

// Atom with an optional postfix factorial: n!, (n+1)!
fn parse_atom(input: &str) -> IResult<&str, ParseNode> {
    let (input, atom) = preceded(
        multispace0,
        alt((parse_number, parse_function, parse_variable, parse_parens)),
    )(input)?;
    let (input, bang) = opt(preceded(multispace0, char('!')))(input)?;
    let node = match bang {
        Some(_) => ParseNode::Function("factorial".to_string(), vec![atom]),
        None => atom,
    };
    Ok((input, node))
}

fn power_operator(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, alt((tag("**"), tag("^"))))(input)
}

/// Leading signs; `true` when they multiply to a minus.
fn parse_signs(input: &str) -> IResult<&str, bool> {
    map(
        many0(preceded(multispace0, one_of("+-"))),
        |signs: Vec<char>| signs.iter().filter(|c| **c == '-').count() % 2 == 1,
    )(input)
}

// Power - right associative: 2^3^4 = 2^(3^4), not (2^3)^4
// `**` is accepted as a synonym for `^`; exponents may carry a sign: n^-2.
fn parse_power(input: &str) -> IResult<&str, ParseNode> {
    let (input, base) = parse_atom(input)?;
    let (input, chain) = many0(preceded(power_operator, pair(parse_signs, parse_atom)))(input)?;
    if chain.is_empty() {
        Ok((input, base))
    } else {
        Ok((input, ParseNode::Power(Box::new(base), chain)))
    }
}

fn parse_unary(input: &str) -> IResult<&str, ParseNode> {
    let (input, negated) = parse_signs(input)?;
    let (input, node) = parse_power(input)?;
    if negated {
        Ok((input, ParseNode::Neg(Box::new(node))))
    } else {
        Ok((input, node))
    }
}

fn mul_operator(input: &str) -> IResult<&str, MulOp> {
    preceded(
        multispace0,
        alt((map(tag("*"), |_| MulOp::Mul), map(tag("/"), |_| MulOp::Div))),
    )(input)
}

// Term - explicit * and /, then implicit multiplication: 2n → 2*n, 3(n+1) → 3*(n+1)
fn parse_term(input: &str) -> IResult<&str, ParseNode> {
    let (input, first) = parse_unary(input)?;
    let (mut input, mut rest) = many0(pair(mul_operator, parse_unary))(input)?;

    // Implicit multiplication only applies with no whitespace between the factors.
    loop {
        let last = rest.last().map(|(_, node)| node).unwrap_or(&first);
        let starts_factor = matches!(
            input.chars().next(),
            Some(c) if c.is_alphabetic() || c == '_' || c == '('
        );
        if !(starts_factor && can_implicit_mul(last)) {
            break;
        }
        match parse_power(input) {
            Ok((remaining, factor)) => {
                rest.push((MulOp::Mul, factor));
                input = remaining;
            }
            Err(_) => break,
        }
    }

    if rest.is_empty() {
        Ok((input, first))
    } else {
        Ok((input, ParseNode::Product(Box::new(first), rest)))
    }
}

// Only a trailing number or power can be followed by an implicit factor.
fn can_implicit_mul(node: &ParseNode) -> bool {
    match node {
        ParseNode::Number(_) | ParseNode::Power(_, _) => true,
        ParseNode::Neg(inner) => matches!(**inner, ParseNode::Number(_) | ParseNode::Power(_, _)),
        _ => false,
    }
}

fn add_operator(input: &str) -> IResult<&str, AddOp> {
    preceded(
        multispace0,
        alt((map(tag("+"), |_| AddOp::Add), map(tag("-"), |_| AddOp::Sub))),
    )(input)
}

fn parse_expr(input: &str) -> IResult<&str, ParseNode> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(add_operator, parse_term))(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        Ok((input, ParseNode::Sum(Box::new(first), rest)))
    }
}

/// Deepest parenthesis nesting in `input`; the grammar recurses once per level.
fn paren_depth(input: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    for c in input.chars() {
        match c {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

/// Parse `input` into `ctx`, resolving every name through `bindings`.
pub fn parse(input: &str, ctx: &mut Context, bindings: &Bindings) -> Result<ExprId, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if paren_depth(input) > MAX_NESTING {
        return Err(ParseError::TooDeep(MAX_NESTING));
    }

    let (remaining, expr_node) =
        parse_expr(input).map_err(|e| ParseError::NomError(format!("{}", e)))?;

    let remaining = remaining.trim();
    if !remaining.is_empty() {
        return Err(ParseError::UnconsumedInput(remaining.to_string()));
    }
    if expr_node.power_depth() > MAX_NESTING {
        return Err(ParseError::TooDeep(MAX_NESTING));
    }

    expr_node.lower(ctx, bindings)
}
