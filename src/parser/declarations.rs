//! Declaration parsing implementation
//!
//! This module handles parsing of type declarations and their members:
//!
//! - Class declarations: `class Name extends Base implements I1, I2 { ... }`
//! - Interface declarations: signatures, default methods, fields
//! - Fields with optional initialisers, methods, constructors
//! - `enum` declarations (brace-matched and discarded)
//!
//! # Grammar
//!
//! ```text
//! type_decl  ::= modifiers ("class" class_decl | "interface" iface_decl | "enum" <discarded>)
//! class_decl ::= ident generics? ("extends" type)? ("implements" type_list)? "{" member* "}"
//! member     ::= field | method | constructor
//! method     ::= modifiers type ident "(" params ")" ("throws" ident_list)? (block | ";")
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the
//! [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{ParseError, Parser};

/// Modifier flags collected before a declaration
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Modifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_native: bool,
    pub is_default: bool,
}

impl Parser {
    /// Parse one top-level type declaration; enums yield `None`
    pub(crate) fn parse_type_declaration(&mut self) -> Result<Option<Declaration>, ParseError> {
        let mods = self.parse_modifiers()?;

        if self.match_token(&Token::Enum(self.current_location())) {
            self.discard_enum()?;
            return Ok(None);
        }

        if self.match_token(&Token::Class(self.current_location())) {
            return Ok(Some(Declaration::Class(self.parse_class_declaration(mods)?)));
        }

        if self.match_token(&Token::Interface(self.current_location())) {
            return Ok(Some(Declaration::Interface(
                self.parse_interface_declaration()?,
            )));
        }

        Err(ParseError {
            message: format!(
                "Expected class or interface declaration, found {}",
                self.peek()
            ),
            location: self.current_location(),
        })
    }

    /// Collect modifier keywords (and interleaved annotations)
    pub(crate) fn parse_modifiers(&mut self) -> Result<Modifiers, ParseError> {
        let mut mods = Modifiers::default();
        loop {
            self.skip_annotations()?;
            let token = self.peek_token();
            if !token.is_modifier() {
                break;
            }
            match token {
                Token::Static(_) => mods.is_static = true,
                Token::Abstract(_) => mods.is_abstract = true,
                Token::Final(_) => mods.is_final = true,
                Token::Native(_) => mods.is_native = true,
                Token::Default(_) => mods.is_default = true,
                // public/private/protected/synchronized/transient/volatile
                // carry no runtime meaning here
                _ => {}
            }
            self.advance();
        }
        Ok(mods)
    }

    /// Consume an entire enum declaration without building anything
    fn discard_enum(&mut self) -> Result<(), ParseError> {
        self.expect_identifier()?;
        // Optional implements list
        if self.match_token(&Token::Implements(self.current_location())) {
            loop {
                self.parse_type()?;
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.skip_balanced(
            &Token::LBrace(self.current_location()),
            &Token::RBrace(self.current_location()),
        )?;
        // Optional trailing semicolon
        self.match_token(&Token::Semicolon(self.current_location()));
        Ok(())
    }

    /// Consume `<...>` generic parameter declarations without keeping them
    fn skip_generic_params(&mut self) -> Result<(), ParseError> {
        if self.check(&Token::Lt(self.current_location())) {
            let mut depth = 0usize;
            loop {
                if self.is_at_end() {
                    return Err(ParseError {
                        message: "Unbalanced generic parameter list".to_string(),
                        location: self.current_location(),
                    });
                }
                match self.advance() {
                    Token::Lt(_) => depth += 1,
                    Token::Gt(_) => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Parse class body after the `class` keyword has been consumed
    fn parse_class_declaration(&mut self, mods: Modifiers) -> Result<ClassDecl, ParseError> {
        let loc = self.previous_location();
        let name = self.expect_identifier()?;
        self.skip_generic_params()?;

        let super_class = if self.match_token(&Token::Extends(self.current_location())) {
            Some(self.parse_type()?.name)
        } else {
            None
        };

        let mut interfaces = Vec::new();
        if self.match_token(&Token::Implements(self.current_location())) {
            loop {
                interfaces.push(self.parse_type()?.name);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }

        self.expect_lbrace("after class header")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            self.parse_member(&name, &mut fields, &mut methods)?;
        }

        self.expect_rbrace("after class body")?;

        Ok(ClassDecl {
            name,
            super_class,
            interfaces,
            fields,
            methods,
            is_abstract: mods.is_abstract,
            location: loc,
        })
    }

    /// Parse interface body after the `interface` keyword has been consumed
    fn parse_interface_declaration(&mut self) -> Result<InterfaceDecl, ParseError> {
        let loc = self.previous_location();
        let name = self.expect_identifier()?;
        self.skip_generic_params()?;

        let mut extends = Vec::new();
        if self.match_token(&Token::Extends(self.current_location())) {
            loop {
                extends.push(self.parse_type()?.name);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }

        self.expect_lbrace("after interface header")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            self.parse_member(&name, &mut fields, &mut methods)?;
        }

        self.expect_rbrace("after interface body")?;

        // Interface methods without bodies are implicitly abstract
        for method in &mut methods {
            if method.body.is_none() {
                method.is_abstract = true;
            }
        }

        Ok(InterfaceDecl {
            name,
            extends,
            fields,
            methods,
            location: loc,
        })
    }

    /// Parse one class/interface member into `fields` or `methods`
    fn parse_member(
        &mut self,
        enclosing: &str,
        fields: &mut Vec<FieldDecl>,
        methods: &mut Vec<MethodDecl>,
    ) -> Result<(), ParseError> {
        // Stray semicolons are legal member separators
        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(());
        }

        let mods = self.parse_modifiers()?;
        self.skip_generic_params()?;
        let loc = self.current_location();

        // Constructor: the name equals the enclosing class and is followed
        // by '('
        if let Token::Ident(name, _) = self.peek_token() {
            if name == enclosing && matches!(self.peek_ahead(1), Some(Token::LParen(_))) {
                self.advance();
                let mut method = self.parse_method_rest(&name, TypeNode::new("void"), mods, loc)?;
                method.is_constructor = true;
                method.name = "<init>".to_string();
                methods.push(method);
                return Ok(());
            }
        }

        let member_type = self.parse_type()?;
        let name = self.expect_identifier()?;

        if self.check(&Token::LParen(self.current_location())) {
            methods.push(self.parse_method_rest(&name, member_type, mods, loc)?);
            return Ok(());
        }

        // Field declaration, possibly multi-variable
        self.parse_field_declarators(name, member_type, mods, loc, fields)
    }

    /// The declarator list of a (possibly multi-variable) field declaration
    fn parse_field_declarators(
        &mut self,
        first_name: String,
        member_type: TypeNode,
        mods: Modifiers,
        loc: SourceLocation,
        fields: &mut Vec<FieldDecl>,
    ) -> Result<(), ParseError> {
        let mut name = first_name;
        loop {
            let init = if self.match_token(&Token::Eq(self.current_location())) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            fields.push(FieldDecl {
                name: name.clone(),
                field_type: member_type.clone(),
                is_static: mods.is_static,
                is_final: mods.is_final,
                init,
                location: loc,
            });
            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
            name = self.expect_identifier()?;
        }
        self.expect_semicolon("after field declaration")?;
        Ok(())
    }

    /// Parse the remainder of a method once its name has been consumed:
    /// parameters, optional throws list, then a block body or `;`
    fn parse_method_rest(
        &mut self,
        name: &str,
        return_type: TypeNode,
        mods: Modifiers,
        loc: SourceLocation,
    ) -> Result<MethodDecl, ParseError> {
        self.expect_lparen("after method name")?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen(self.current_location())) {
            loop {
                self.skip_annotations()?;
                // `final` on parameters is legal and meaningless here
                self.match_token(&Token::Final(self.current_location()));
                let param_type = self.parse_type()?;
                let param_name = self.expect_identifier()?;
                params.push(Param {
                    name: param_name,
                    param_type,
                });
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }
        self.expect_rparen("after parameter list")?;

        let mut throws = Vec::new();
        if self.match_token(&Token::Throws(self.current_location())) {
            loop {
                throws.push(self.parse_type()?.name);
                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
        }

        let body = if self.match_token(&Token::Semicolon(self.current_location())) {
            // Abstract, native, or interface signature
            None
        } else {
            self.expect_lbrace("before method body")?;
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after method body")?;
            Some(statements)
        };

        Ok(MethodDecl {
            name: name.to_string(),
            params,
            return_type,
            body,
            is_static: mods.is_static,
            is_abstract: mods.is_abstract,
            is_native: mods.is_native,
            is_constructor: false,
            throws,
            location: loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn parse_class(source: &str) -> ClassDecl {
        let mut parser = Parser::new(source).expect("lexing failed");
        let program = parser.parse_program().expect("parsing failed");
        match program.declarations.into_iter().next().unwrap() {
            Declaration::Class(c) => c,
            other => panic!("expected class, got {:?}", other.name()),
        }
    }

    #[test]
    fn test_constructor_recognised() {
        let class = parse_class("class Point { int x; Point(int x) { this.x = x; } }");
        assert_eq!(class.methods.len(), 1);
        assert!(class.methods[0].is_constructor);
        assert_eq!(class.methods[0].name, "<init>");
        assert_eq!(class.methods[0].params.len(), 1);
    }

    #[test]
    fn test_extends_and_implements() {
        let class = parse_class("class Dog extends Animal implements Pet, Comparable<Dog> { }");
        assert_eq!(class.super_class.as_deref(), Some("Animal"));
        assert_eq!(class.interfaces, vec!["Pet", "Comparable"]);
    }

    #[test]
    fn test_multi_variable_field() {
        let class = parse_class("class A { int a = 1, b = 2, c; }");
        assert_eq!(class.fields.len(), 3);
        assert_eq!(class.fields[1].name, "b");
        assert!(class.fields[2].init.is_none());
    }

    #[test]
    fn test_interface_members() {
        let source = "interface Shape { int SIDES = 4; double area(); default String name() { return \"shape\"; } }";
        let mut parser = Parser::new(source).unwrap();
        let program = parser.parse_program().unwrap();
        match &program.declarations[0] {
            Declaration::Interface(i) => {
                assert_eq!(i.fields.len(), 1);
                assert_eq!(i.methods.len(), 2);
                assert!(i.methods[0].is_abstract);
                assert!(!i.methods[1].is_abstract);
            }
            _ => panic!("Expected interface"),
        }
    }

    #[test]
    fn test_abstract_and_native_methods() {
        let class = parse_class("abstract class A { abstract void run(); native int id(); }");
        assert!(class.is_abstract);
        assert!(class.methods[0].body.is_none());
        assert!(class.methods[1].is_native);
    }

    #[test]
    fn test_throws_clause() {
        let class = parse_class("class A { void risky() throws Exception, RuntimeException { } }");
        assert_eq!(class.methods[0].throws, vec!["Exception", "RuntimeException"]);
    }
}
