//! Expression parsing implementation
//!
//! This module handles parsing of expressions using precedence climbing for
//! binary operators and recursive descent for the rest.
//!
//! # Precedence, low → high
//!
//! assignment (right-assoc) → ternary → `||` → `&&` → `|` → `&` →
//! equality → comparison / `instanceof` → additive → multiplicative →
//! unary prefix → cast → postfix → primary
//!
//! # Disambiguation
//!
//! - Lambda: an identifier followed by `->`, or a `(` whose matching `)` is
//!   followed by `->`.
//! - Cast: `(Type) expr` by trial parse — the parenthesised prefix must
//!   parse as a type and the token after `)` must be able to start an
//!   operand.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the
//! [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment (right-associative): `=`, `+=`, `-=`, `*=`, `/=`, `%=`
    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_ternary()?;

        let loc = self.current_location();
        let compound_op = if self.match_token(&Token::Eq(loc)) {
            None
        } else if self.match_token(&Token::PlusEq(loc)) {
            Some(BinOp::Add)
        } else if self.match_token(&Token::MinusEq(loc)) {
            Some(BinOp::Sub)
        } else if self.match_token(&Token::StarEq(loc)) {
            Some(BinOp::Mul)
        } else if self.match_token(&Token::SlashEq(loc)) {
            Some(BinOp::Div)
        } else if self.match_token(&Token::PercentEq(loc)) {
            Some(BinOp::Mod)
        } else {
            return Ok(expr);
        };

        let value = Box::new(self.parse_assignment()?);
        Ok(Expr::Assign {
            target: Box::new(expr),
            op: compound_op,
            value,
            location: loc,
        })
    }

    /// Parse ternary: condition ? then : else
    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_logical_or()?;

        if self.match_token(&Token::Question(self.current_location())) {
            let loc = self.previous_location();
            let then_expr = Box::new(self.parse_expression()?);
            self.expect_token(
                &Token::Colon(self.current_location()),
                "Expected ':' in ternary expression",
            )?;
            let else_expr = Box::new(self.parse_ternary()?);
            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_expr,
                else_expr,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&Token::OrOr(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_logical_and()?);
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_or()?;

        while self.match_token(&Token::AndAnd(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_bitwise_or()?);
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse bitwise OR (|)
    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;

        while self.match_token(&Token::Pipe(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_bitwise_and()?);
            left = Expr::Binary {
                op: BinOp::BitOr,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::Amp(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_equality()?);
            left = Expr::Binary {
                op: BinOp::BitAnd,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::EqEq(loc)) {
                BinOp::Eq
            } else if self.match_token(&Token::NotEq(loc)) {
                BinOp::Ne
            } else {
                break;
            };

            let right = Box::new(self.parse_comparison()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse comparison (< <= > >=) and `instanceof`
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let loc = self.current_location();
            if self.match_token(&Token::Instanceof(loc)) {
                let target_type = self.parse_type()?;
                left = Expr::InstanceOf {
                    expr: Box::new(left),
                    target_type,
                    location: loc,
                };
                continue;
            }

            let op = if self.match_token(&Token::Lt(loc)) {
                BinOp::Lt
            } else if self.match_token(&Token::Le(loc)) {
                BinOp::Le
            } else if self.match_token(&Token::Gt(loc)) {
                BinOp::Gt
            } else if self.match_token(&Token::Ge(loc)) {
                BinOp::Ge
            } else {
                break;
            };

            let right = Box::new(self.parse_additive()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = Box::new(self.parse_multiplicative()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else if self.match_token(&Token::Percent(loc)) {
                BinOp::Mod
            } else {
                break;
            };

            let right = Box::new(self.parse_unary()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse unary prefix: `!`, `-`, `++`, `--`
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Bang(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Minus(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::PlusPlus(loc)) {
            let target = Box::new(self.parse_unary()?);
            return Ok(Expr::IncDec {
                target,
                increment: true,
                prefix: true,
                location: loc,
            });
        }

        if self.match_token(&Token::MinusMinus(loc)) {
            let target = Box::new(self.parse_unary()?);
            return Ok(Expr::IncDec {
                target,
                increment: false,
                prefix: true,
                location: loc,
            });
        }

        self.parse_cast()
    }

    /// Parse `(Type) expr` by trial parse, falling back to postfix
    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::LParen(self.current_location())) && self.is_type_token_at(1) {
            let saved = self.position;
            let loc = self.current_location();
            self.advance(); // consume '('

            if let Ok(target_type) = self.parse_type() {
                if self.check(&Token::RParen(loc)) && self.cast_operand_follows() {
                    self.advance(); // consume ')'
                    let expr = Box::new(self.parse_unary()?);
                    return Ok(Expr::Cast {
                        target_type,
                        expr,
                        location: loc,
                    });
                }
            }

            self.position = saved;
        }

        self.parse_postfix()
    }

    /// Whether the token after the closing `)` of a candidate cast can
    /// start a cast operand. `-` is deliberately excluded so `(x) - y`
    /// stays a subtraction.
    fn cast_operand_follows(&self) -> bool {
        matches!(
            self.peek_ahead(1),
            Some(
                Token::Ident(_, _)
                    | Token::IntLiteral(_, _)
                    | Token::FloatLiteral(_, _)
                    | Token::StringLiteral(_, _)
                    | Token::CharLiteral(_, _)
                    | Token::True(_)
                    | Token::False(_)
                    | Token::Null(_)
                    | Token::This(_)
                    | Token::Super(_)
                    | Token::New(_)
                    | Token::LParen(_)
                    | Token::Bang(_)
            )
        )
    }

    /// Parse postfix chains: `.field`, `.method(args)`, `[index]`,
    /// `(args)` (unqualified calls), `::method`, `++`, `--`
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::Dot(loc)) {
                let name = self.expect_identifier()?;
                if self.check(&Token::LParen(loc)) {
                    let args = self.parse_argument_list()?;
                    expr = Expr::MethodCall {
                        receiver: Some(Box::new(expr)),
                        name,
                        args,
                        location: loc,
                    };
                } else {
                    expr = Expr::FieldAccess {
                        object: Box::new(expr),
                        field: name,
                        location: loc,
                    };
                }
                continue;
            }

            if self.check(&Token::LBracket(loc)) {
                self.advance();
                let index = Box::new(self.parse_expression()?);
                self.expect_token(&Token::RBracket(loc), "Expected ']' after array index")?;
                expr = Expr::ArrayAccess {
                    array: Box::new(expr),
                    index,
                    location: loc,
                };
                continue;
            }

            // Unqualified call: only an identifier can be called directly
            if self.check(&Token::LParen(loc)) {
                if let Expr::Ident(name, id_loc) = &expr {
                    let name = name.clone();
                    let id_loc = *id_loc;
                    let args = self.parse_argument_list()?;
                    expr = Expr::MethodCall {
                        receiver: None,
                        name,
                        args,
                        location: id_loc,
                    };
                    continue;
                }
                break;
            }

            if self.match_token(&Token::ColonColon(loc)) {
                let method = self.expect_identifier()?;
                let target = match &expr {
                    Expr::Ident(name, _) => name.clone(),
                    other => {
                        return Err(ParseError {
                            message: "Method reference target must be a name".to_string(),
                            location: other.location(),
                        })
                    }
                };
                expr = Expr::MethodRef {
                    target,
                    method,
                    location: loc,
                };
                continue;
            }

            if self.match_token(&Token::PlusPlus(loc)) {
                expr = Expr::IncDec {
                    target: Box::new(expr),
                    increment: true,
                    prefix: false,
                    location: loc,
                };
                continue;
            }

            if self.match_token(&Token::MinusMinus(loc)) {
                expr = Expr::IncDec {
                    target: Box::new(expr),
                    increment: false,
                    prefix: false,
                    location: loc,
                };
                continue;
            }

            break;
        }

        Ok(expr)
    }

    /// Parse `( arg, arg, ... )`
    pub(crate) fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_lparen("before argument list")?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen(self.current_location())) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.expect_rparen("after argument list")?;
        Ok(args)
    }

    /// Parse primary expressions: literals, `this`, `super`, `new`,
    /// parenthesised expressions, identifiers, lambdas
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        // Lambda: identifier followed by '->'
        if let (Token::Ident(name, _), Some(Token::Arrow(_))) =
            (self.peek_token(), self.peek_ahead(1))
        {
            self.advance(); // identifier
            self.advance(); // '->'
            let body = self.parse_lambda_body()?;
            return Ok(Expr::Lambda {
                params: vec![name],
                body,
                location: loc,
            });
        }

        // Lambda: '(' params ')' '->'
        if self.check(&Token::LParen(loc)) && self.lambda_params_ahead() {
            return self.parse_paren_lambda(loc);
        }

        match self.peek_token() {
            Token::IntLiteral(n, _) => {
                self.advance();
                Ok(Expr::IntLit(n, loc))
            }
            Token::FloatLiteral(x, _) => {
                self.advance();
                Ok(Expr::FloatLit(x, loc))
            }
            Token::StringLiteral(s, _) => {
                self.advance();
                Ok(Expr::StringLit(s, loc))
            }
            Token::CharLiteral(c, _) => {
                self.advance();
                Ok(Expr::CharLit(c, loc))
            }
            Token::True(_) => {
                self.advance();
                Ok(Expr::BoolLit(true, loc))
            }
            Token::False(_) => {
                self.advance();
                Ok(Expr::BoolLit(false, loc))
            }
            Token::Null(_) => {
                self.advance();
                Ok(Expr::NullLit(loc))
            }
            Token::This(_) => {
                self.advance();
                if self.check(&Token::LParen(loc)) {
                    // Delegating constructor call this(...)
                    let args = self.parse_argument_list()?;
                    return Ok(Expr::MethodCall {
                        receiver: Some(Box::new(Expr::This(loc))),
                        name: "<init>".to_string(),
                        args,
                        location: loc,
                    });
                }
                Ok(Expr::This(loc))
            }
            Token::Super(_) => {
                self.advance();
                if self.check(&Token::LParen(loc)) {
                    // Superclass constructor call super(...)
                    let args = self.parse_argument_list()?;
                    return Ok(Expr::MethodCall {
                        receiver: Some(Box::new(Expr::Super(loc))),
                        name: "<init>".to_string(),
                        args,
                        location: loc,
                    });
                }
                Ok(Expr::Super(loc))
            }
            Token::New(_) => {
                self.advance();
                self.parse_new_expression(loc)
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after parenthesised expression")?;
                Ok(expr)
            }
            Token::Ident(name, _) => {
                self.advance();
                Ok(Expr::Ident(name, loc))
            }
            other => Err(ParseError {
                message: format!("Expected expression, found {}", other),
                location: loc,
            }),
        }
    }

    /// Lookahead: does the `(` at the current position open a lambda
    /// parameter list, i.e. is its matching `)` followed by `->`?
    fn lambda_params_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0usize;
        while let Some(token) = self.peek_ahead(offset) {
            match token {
                Token::LParen(_) => depth += 1,
                Token::RParen(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_ahead(offset + 1), Some(Token::Arrow(_)));
                    }
                }
                Token::Eof(_) => return false,
                _ => {}
            }
            offset += 1;
        }
        false
    }

    /// Parse `( p1, p2 ) -> body`; parameter types, if present, are
    /// consumed and discarded
    fn parse_paren_lambda(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        self.expect_lparen("before lambda parameters")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen(loc)) {
            loop {
                // Optionally typed parameter: `(int a, int b) -> ...`
                if self.is_type_token_at(0) && matches!(self.peek_ahead(1), Some(Token::Ident(_, _)))
                {
                    self.parse_type()?;
                }
                params.push(self.expect_identifier()?);
                if !self.match_token(&Token::Comma(loc)) {
                    break;
                }
            }
        }
        self.expect_rparen("after lambda parameters")?;
        self.expect_token(&Token::Arrow(loc), "Expected '->' after lambda parameters")?;
        let body = self.parse_lambda_body()?;
        Ok(Expr::Lambda {
            params,
            body,
            location: loc,
        })
    }

    /// Lambda body: block or bare expression
    fn parse_lambda_body(&mut self) -> Result<LambdaBody, ParseError> {
        if self.match_token(&Token::LBrace(self.current_location())) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after lambda body")?;
            Ok(LambdaBody::Block(statements))
        } else {
            Ok(LambdaBody::Expr(Box::new(self.parse_expression()?)))
        }
    }

    /// Parse what follows `new`: constructor call or array creation
    fn parse_new_expression(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        let created_type = self.parse_type()?;

        if self.check(&Token::LParen(loc)) {
            let args = self.parse_argument_list()?;
            return Ok(Expr::New {
                class_name: created_type.name,
                args,
                location: loc,
            });
        }

        if self.check(&Token::LBracket(loc)) || created_type.array_dims > 0 {
            // `new T[]{...}` — parse_type already swallowed the empty
            // bracket pair, so an initializer list must follow
            let mut element_type = created_type.clone();
            if created_type.array_dims > 0 {
                element_type.array_dims -= 1;
                self.expect_lbrace("in array initialiser")?;
                let init = self.parse_array_initialiser()?;
                return Ok(Expr::NewArray {
                    element_type,
                    dims: Vec::new(),
                    init: Some(init),
                    location: loc,
                });
            }

            // `new T[e]` / `new T[e1][e2]` / `new T[e][]`
            let mut dims = Vec::new();
            while self.match_token(&Token::LBracket(loc)) {
                if self.match_token(&Token::RBracket(loc)) {
                    break;
                }
                dims.push(self.parse_expression()?);
                self.expect_token(&Token::RBracket(loc), "Expected ']' after array length")?;
            }
            return Ok(Expr::NewArray {
                element_type,
                dims,
                init: None,
                location: loc,
            });
        }

        Err(ParseError {
            message: format!("Expected '(' or '[' after 'new {}'", created_type.name),
            location: self.current_location(),
        })
    }

    /// Parse `{ e1, e2, ... }` after the opening brace has been consumed
    fn parse_array_initialiser(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut elements = Vec::new();
        if !self.check(&Token::RBrace(self.current_location())) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
                // Trailing comma
                if self.check(&Token::RBrace(self.current_location())) {
                    break;
                }
            }
        }
        self.expect_rbrace("after array initialiser")?;
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn parse_expr(source: &str) -> Expr {
        let mut parser = Parser::new(source).expect("lexing failed");
        parser.parse_expression().expect("parsing failed")
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_assignment_right_assoc() {
        match parse_expr("a = b = 1") {
            Expr::Assign { value, .. } => {
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_ternary() {
        assert!(matches!(parse_expr("a > 0 ? a : -a"), Expr::Ternary { .. }));
    }

    #[test]
    fn test_instanceof() {
        match parse_expr("x instanceof String") {
            Expr::InstanceOf { target_type, .. } => assert_eq!(target_type.name, "String"),
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_cast_vs_parens() {
        assert!(matches!(parse_expr("(int) x"), Expr::Cast { .. }));
        // `(x) - y` must stay a subtraction
        assert!(matches!(
            parse_expr("(x) - y"),
            Expr::Binary { op: BinOp::Sub, .. }
        ));
    }

    #[test]
    fn test_postfix_chain() {
        match parse_expr("list.get(0).toString()") {
            Expr::MethodCall { name, receiver, .. } => {
                assert_eq!(name, "toString");
                assert!(matches!(
                    receiver.as_deref(),
                    Some(Expr::MethodCall { .. })
                ));
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_unqualified_call() {
        match parse_expr("factorial(5)") {
            Expr::MethodCall { receiver, name, args, .. } => {
                assert!(receiver.is_none());
                assert_eq!(name, "factorial");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_lambda_forms() {
        assert!(matches!(
            parse_expr("x -> x + 1"),
            Expr::Lambda { ref params, .. } if params.len() == 1
        ));
        assert!(matches!(
            parse_expr("(a, b) -> a + b"),
            Expr::Lambda { ref params, .. } if params.len() == 2
        ));
        assert!(matches!(
            parse_expr("() -> { return 1; }"),
            Expr::Lambda { ref body, .. } if matches!(body, LambdaBody::Block(_))
        ));
    }

    #[test]
    fn test_method_reference() {
        match parse_expr("String::valueOf") {
            Expr::MethodRef { target, method, .. } => {
                assert_eq!(target, "String");
                assert_eq!(method, "valueOf");
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_new_forms() {
        assert!(matches!(parse_expr("new ArrayList()"), Expr::New { .. }));
        match parse_expr("new int[5]") {
            Expr::NewArray { dims, init, .. } => {
                assert_eq!(dims.len(), 1);
                assert!(init.is_none());
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
        match parse_expr("new int[]{1, 2, 3}") {
            Expr::NewArray { dims, init, .. } => {
                assert!(dims.is_empty());
                assert_eq!(init.unwrap().len(), 3);
            }
            other => panic!("unexpected parse at {:?}", other.location()),
        }
    }

    #[test]
    fn test_inc_dec_forms() {
        assert!(matches!(
            parse_expr("i++"),
            Expr::IncDec {
                increment: true,
                prefix: false,
                ..
            }
        ));
        assert!(matches!(
            parse_expr("--i"),
            Expr::IncDec {
                increment: false,
                prefix: true,
                ..
            }
        ));
    }
}
