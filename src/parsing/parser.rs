//! The docopt parser driver
//!
//! A recursive-descent parser built around a single generic consume
//! loop. The driver owns the stateful lexer, keeps a one-token
//! lookahead plus a short token history, and walks the document in five
//! steps: prologue, usage section, a free section, the options section,
//! and a trailing free section. Each step switches the lexer state on
//! entry and leaves the driver holding a well-defined current token for
//! the next step.
//!
//! Parsing never panics on malformed input: grammar errors end the
//! current step and are recorded, lexer errors discard one byte and
//! retry, and a budget of `MAX_ERROR` failures clears the `run` flag,
//! which winds every loop down.

use crate::ast::{DocoptAst, NodeId, NodeKind};
use crate::lexing::{states, StateLexer, Token, TokenKind};
use crate::parsing::error::{InitError, ParseError};
use crate::parsing::reason::Reason;
use std::collections::{HashMap, VecDeque};

/// Parsing stops once this many errors have been recorded.
pub const MAX_ERROR: usize = 10;

/// Tokens of history kept for line-start detection.
const HISTORY_LEN: usize = 8;

type ConsumeFn = for<'a, 's> fn(&'a mut DocoptParser<'s>) -> Result<Reason, ParseError>;

/// How the consume loop frames one AST kind.
#[derive(Clone, Copy)]
struct ConsumerDef {
    /// Append a node of the loop's own kind and descend into it.
    create_self_node: bool,
    /// Append a `toplevel_node` child and descend into it.
    create_node: bool,
    toplevel_node: NodeKind,
    /// Save the current node on entry, restore it on normal exit.
    save_current_node: bool,
    /// Push the current token back so the loop re-reads it.
    reject_first_token: bool,
    consume: ConsumeFn,
}

/// The parser. Build one with [`DocoptParser::new`], then call
/// [`parse`](DocoptParser::parse); the AST and the error list stay
/// readable on the parser afterwards.
pub struct DocoptParser<'s> {
    lexer: StateLexer<'s>,
    prog_name: String,
    current_token: Option<Token>,
    next_token: Option<Token>,
    history: VecDeque<Token>,
    error_count: usize,
    errors: Vec<ParseError>,
    ast: DocoptAst,
    current_node: Option<NodeId>,
    options_node: Option<NodeId>,
    usage_node: Option<NodeId>,
    lexer_state_changed: bool,
    run: bool,
    parse_def: HashMap<NodeKind, ConsumerDef>,
}

impl<'s> DocoptParser<'s> {
    /// Create a parser over a UTF-8 byte buffer.
    pub fn new(source: &'s [u8]) -> Result<Self, InitError> {
        let lexer =
            StateLexer::new(source, states::STATE_PROLOGUE).map_err(InitError::Lexer)?;

        let mut parse_def = HashMap::new();
        parse_def.insert(
            NodeKind::UsageExpr,
            ConsumerDef {
                create_self_node: false,
                create_node: false,
                toplevel_node: NodeKind::NoneNode,
                save_current_node: true,
                reject_first_token: true,
                consume: consume_usage_expr,
            },
        );
        let group_def = ConsumerDef {
            create_self_node: true,
            create_node: true,
            toplevel_node: NodeKind::UsageExpr,
            save_current_node: true,
            reject_first_token: false,
            consume: consume_group,
        };
        parse_def.insert(NodeKind::UsageOptionalGroup, group_def);
        parse_def.insert(NodeKind::UsageRequiredGroup, group_def);

        Ok(Self {
            lexer,
            prog_name: String::new(),
            current_token: None,
            next_token: None,
            history: VecDeque::new(),
            error_count: 0,
            errors: Vec::new(),
            ast: DocoptAst::new(),
            current_node: None,
            options_node: None,
            usage_node: None,
            lexer_state_changed: false,
            run: true,
            parse_def,
        })
    }

    /// Parse the whole document. Either the returned tree is rooted at
    /// `Root` with a populated usage section, or [`errors`] is
    /// non-empty; fatally terminated parses leave a partial tree behind
    /// but always record the failure.
    ///
    /// [`errors`]: DocoptParser::errors
    pub fn parse(&mut self) -> &DocoptAst {
        if self.ast.root().is_some() {
            return &self.ast;
        }
        self.create_node(NodeKind::Root, None);

        let steps: [(&'static str, fn(&mut Self) -> Result<(), ParseError>); 5] = [
            ("consume_prologue", Self::consume_prologue),
            ("consume_usage", Self::consume_usage),
            ("consume_free_section", Self::consume_free_section),
            ("consume_options", Self::consume_options),
            ("consume_free_section", Self::consume_free_section),
        ];
        for (name, step) in steps {
            if let Err(inner) = step(self) {
                self.errors.push(ParseError::Step {
                    name,
                    inner: Box::new(inner),
                });
                self.error_count += 1;
            }
        }
        &self.ast
    }

    /// The tree built so far.
    pub fn ast(&self) -> &DocoptAst {
        &self.ast
    }

    /// Errors recorded during parsing.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// The program name learned from the first usage line.
    pub fn prog_name(&self) -> &str {
        &self.prog_name
    }

    /// The `Options_section` node, once the options step ran.
    pub fn options_node(&self) -> Option<NodeId> {
        self.options_node
    }

    /// The `Usage_section` node, once the prologue step found `Usage:`.
    pub fn usage_node(&self) -> Option<NodeId> {
        self.usage_node
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    /// Advance the lookahead. When the lexer state changed since the
    /// last advance, the buffered next token is rejected first so its
    /// byte range is re-read under the new state.
    fn next_token(&mut self) {
        if self.lexer_state_changed {
            if let Some(next) = self.next_token.take() {
                self.lexer.reject(&next);
                self.history.pop_back();
            }
            self.lexer_state_changed = false;
        }

        match self.next_token.take() {
            Some(token) => self.current_token = Some(token),
            None => match self.fetch_token() {
                Ok(token) => self.current_token = Some(token),
                Err(e) => {
                    self.fatal(e);
                    return;
                }
            },
        }
        match self.fetch_token() {
            Ok(token) => self.next_token = Some(token),
            Err(e) => {
                self.fatal(e);
                return;
            }
        }

        if self.error_count >= MAX_ERROR {
            self.fatal(ParseError::TooManyErrors);
            return;
        }

        if let Some(token) = &self.current_token {
            self.history.push_back(token.clone());
            if self.history.len() > HISTORY_LEN {
                self.history.pop_front();
            }
        }
    }

    /// Pull one token from the lexer, discarding unmatched bytes under
    /// the error budget.
    fn fetch_token(&mut self) -> Result<Token, ParseError> {
        loop {
            if self.error_count >= MAX_ERROR {
                return Err(ParseError::TooManyErrors);
            }
            match self.lexer.next() {
                Ok(token) => return Ok(token),
                Err(e) => {
                    self.errors.push(ParseError::Lex(e));
                    self.error_count += 1;
                    if self.error_count >= MAX_ERROR {
                        return Err(ParseError::TooManyErrors);
                    }
                    self.lexer.discard(1);
                }
            }
        }
    }

    /// Push the current token back; the next advance re-reads it, in
    /// whatever lexer state is then active.
    fn reject_current_token(&mut self) {
        if let Some(token) = self.current_token.take() {
            self.lexer.reject(&token);
            self.history.pop_back();
        }
        self.next_token = None;
    }

    fn change_lexer_state(&mut self, name: &str) -> Result<(), ParseError> {
        self.lexer_state_changed = true;
        self.lexer.change_state(name).map_err(ParseError::Lex)
    }

    fn next_is(&self, kind: TokenKind) -> bool {
        self.next_token.as_ref().map_or(false, |t| t.kind == kind)
    }

    /// Record a fatal error and clear the run flag; every loop exits on
    /// its next iteration.
    fn fatal(&mut self, error: ParseError) {
        if self.run {
            self.errors.push(error);
            self.error_count += 1;
            self.run = false;
        }
    }

    // ------------------------------------------------------------------
    // Tree plumbing
    // ------------------------------------------------------------------

    /// Create a node and descend into it. The first call instantiates
    /// the root.
    fn create_node(&mut self, kind: NodeKind, token: Option<Token>) -> NodeId {
        let id = match self.current_node {
            None => self.ast.add_root(kind, token),
            Some(current) => self.ast.add_child(current, kind, token),
        };
        self.current_node = Some(id);
        id
    }

    fn current_node_id(&self) -> NodeId {
        self.current_node.expect("current node is set after Root")
    }

    fn current_kind(&self) -> NodeKind {
        match self.current_node {
            Some(id) => self.ast.kind(id),
            None => NodeKind::Root,
        }
    }

    /// Descend into a fresh `kind` node unless already on one.
    fn ensure_node(&mut self, kind: NodeKind) {
        if self.current_kind() != kind {
            let id = self.ast.add_child(self.current_node_id(), kind, None);
            self.current_node = Some(id);
        }
    }

    fn add_to_current(&mut self, kind: NodeKind, token: Token) {
        self.ast.add_child(self.current_node_id(), kind, Some(token));
    }

    // ------------------------------------------------------------------
    // Leaving conditions
    // ------------------------------------------------------------------

    fn reached_eof(&self) -> bool {
        self.current_token
            .as_ref()
            .map_or(false, |t| t.kind == TokenKind::Eof)
    }

    /// Two consecutive newlines; optionally consume the second one.
    fn reached_two_newline(&mut self, consume_newline: bool) -> bool {
        let on_boundary = self
            .current_token
            .as_ref()
            .map_or(false, |t| t.kind == TokenKind::Newline)
            && self.next_is(TokenKind::Newline);
        if on_boundary && consume_newline {
            self.next_token();
        }
        on_boundary
    }

    /// The last three tokens form `NEWLINE LONG_BLANK <current>`.
    fn line_start_sequence(&self) -> bool {
        let n = self.history.len();
        n >= 3
            && self.history[n - 2].kind == TokenKind::LongBlank
            && self.history[n - 3].kind == TokenKind::Newline
    }

    /// A new usage line begins: the known program name in line-start
    /// position.
    fn reached_prog_name(&self) -> bool {
        let Some(token) = &self.current_token else {
            return false;
        };
        token.kind == TokenKind::ProgName
            && token.value == self.prog_name
            && self.line_start_sequence()
    }

    /// A usage line starting with a word that is not the program name.
    fn line_start_mismatch(&self) -> bool {
        let Some(token) = &self.current_token else {
            return false;
        };
        matches!(
            token.kind,
            TokenKind::Short | TokenKind::Long | TokenKind::Argument | TokenKind::Ident
        ) && self.line_start_sequence()
    }

    // ------------------------------------------------------------------
    // The generic consume loop
    // ------------------------------------------------------------------

    /// Run the registered consumer for `kind` until it signals a
    /// terminal reason, then restore the saved context.
    fn consume_loop(&mut self, kind: NodeKind) -> Result<Reason, ParseError> {
        let def = *self
            .parse_def
            .get(&kind)
            .expect("consumer definition registered for kind");

        let saved_node = if def.save_current_node {
            self.current_node
        } else {
            None
        };

        if def.create_self_node {
            let id = self.ast.add_child(self.current_node_id(), kind, None);
            self.current_node = Some(id);
        }
        if def.create_node {
            let id = self
                .ast
                .add_child(self.current_node_id(), def.toplevel_node, None);
            self.current_node = Some(id);
        }
        if def.reject_first_token {
            self.reject_current_token();
        }

        let mut result = Ok(Reason::Continue);
        while self.run {
            self.next_token();
            if !self.run {
                break;
            }
            result = (def.consume)(self);
            match &result {
                Err(_) => break,
                Ok(reason) if reason.is_leaving() => break,
                Ok(_) => {}
            }
        }

        if self.run {
            if def.save_current_node {
                self.current_node = saved_node;
            }
            result
        } else {
            Err(ParseError::Stopped {
                node: self.current_kind(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Section consumers
    // ------------------------------------------------------------------

    /// Collect free tokens under `Prologue` until `Usage:` appears, then
    /// open the `Usage_section`.
    fn consume_prologue(&mut self) -> Result<(), ParseError> {
        self.create_node(NodeKind::Prologue, None);

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            if token.kind == TokenKind::Usage {
                let root = self.ast.root().expect("root exists during parse");
                let usage = self.ast.add_child(root, NodeKind::UsageSection, None);
                self.ast.add_child(usage, NodeKind::Usage, Some(token));
                self.usage_node = Some(usage);
                self.current_node = Some(usage);
                return Ok(());
            }

            self.ast
                .add_child(self.current_node_id(), NodeKind::PrologueNode, Some(token.clone()));

            if token.kind == TokenKind::Eof {
                return Err(ParseError::UsageNotFound { token });
            }
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// Usage = USAGE , First_Program_Usage , { Program_Usage } ;
    /// The program name is caught at its first definition and stays the
    /// same literal for the rest of the parse.
    fn consume_usage(&mut self) -> Result<(), ParseError> {
        self.consume_first_program_usage()?;
        self.consume_usage_line()
    }

    /// Skip blanks and newlines until the first non-space run, which
    /// becomes the program name; rewrite the `PROG_NAME` lexer rule to
    /// that literal and open the first `Usage_line`.
    fn consume_first_program_usage(&mut self) -> Result<(), ParseError> {
        self.change_lexer_state(states::STATE_FIRST_PROGRAM_USAGE)?;

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            match token.kind {
                TokenKind::ProgName => {
                    self.prog_name = token.value.clone();
                    self.lexer
                        .dynamic_rule_update(states::RULE_PROG_NAME, &self.prog_name)
                        .map_err(ParseError::Lex)?;

                    let line =
                        self.ast
                            .add_child(self.current_node_id(), NodeKind::UsageLine, None);
                    self.ast.add_child(line, NodeKind::ProgName, Some(token));
                    self.current_node = Some(line);
                    return Ok(());
                }
                TokenKind::Blank => continue,
                TokenKind::Newline => {
                    if self.next_is(TokenKind::Newline) {
                        if self.prog_name.is_empty() {
                            return Err(ParseError::MissingProgName { token });
                        }
                        self.next_token();
                        return Ok(());
                    }
                    continue;
                }
                _ => return Err(ParseError::ExpectedProgName { token }),
            }
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// Drive `Usage_Expr` loops, starting a sibling `Usage_line` every
    /// time the program name repeats in line-start position.
    fn consume_usage_line(&mut self) -> Result<(), ParseError> {
        self.change_lexer_state(states::STATE_USAGE_LINE)?;

        let line = self.current_node_id();
        let usage_section = match self.ast.parent(line) {
            Some(parent) if self.ast.kind(parent) == NodeKind::UsageSection => parent,
            Some(parent) => {
                return Err(ParseError::WrongNode {
                    expected: NodeKind::UsageSection,
                    actual: self.ast.kind(parent),
                })
            }
            None => {
                return Err(ParseError::WrongNode {
                    expected: NodeKind::UsageSection,
                    actual: self.ast.kind(line),
                })
            }
        };

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            if token.kind == TokenKind::Eof {
                return Ok(());
            }
            if token.kind == TokenKind::ProgName {
                if self.prog_name != token.value {
                    return Err(ParseError::ProgNameMismatch {
                        expected: self.prog_name.clone(),
                        token,
                    });
                }
                continue;
            }
            if token.kind == TokenKind::Usage {
                return Err(ParseError::UsageMisplaced {
                    node: self.current_kind(),
                    token,
                });
            }

            // The token that triggered us is re-seen inside the loop.
            let reason = self.consume_loop(NodeKind::UsageExpr)?;
            match reason {
                Reason::TwoNewline | Reason::EofReached => return Ok(()),
                Reason::ProgNameSequence => {
                    let prog = self
                        .current_token
                        .clone()
                        .expect("prog name token is current");
                    let new_line = self.ast.add_child(usage_section, NodeKind::UsageLine, None);
                    self.ast.add_child(new_line, NodeKind::ProgName, Some(prog));
                    let expr = self.ast.add_child(new_line, NodeKind::UsageExpr, None);
                    self.current_node = Some(expr);
                    continue;
                }
                Reason::Continue | Reason::EndOfGroup => {
                    let error = ParseError::LoopContract {
                        node: self.current_kind(),
                    };
                    self.fatal(error.clone());
                    return Err(error);
                }
            }
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// An arbitrary titled section between the usage and options
    /// sections, or trailing the document. Another heading inside opens
    /// a nested `Free_section` under the root.
    fn consume_free_section(&mut self) -> Result<(), ParseError> {
        if self.lexer.state_name() != states::STATE_FREE {
            self.change_lexer_state(states::STATE_FREE)?;
        }
        let root = self.ast.root().expect("root exists during parse");
        let section = self.ast.add_child(root, NodeKind::FreeSection, None);
        self.current_node = Some(section);

        if let Some(token) = self.current_token.clone() {
            if token.kind == TokenKind::Section {
                self.ast.add_child(section, NodeKind::SectionName, Some(token));
            }
        }

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            match token.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Section => {
                    if token.value.eq_ignore_ascii_case("options:") {
                        return Ok(());
                    }
                    if token.value.eq_ignore_ascii_case("usage:") {
                        return Err(ParseError::UsageMisplaced {
                            node: NodeKind::FreeSection,
                            token,
                        });
                    }
                    // an empty unnamed section adopts the heading
                    if self.ast.children(section).is_empty() {
                        self.ast.add_child(section, NodeKind::SectionName, Some(token));
                        continue;
                    }
                    return self.consume_free_section();
                }
                _ => {
                    self.ast.add_child(section, NodeKind::SectionNode, Some(token));
                }
            }
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// Only active when the current token is the `Options:` heading; the
    /// empty `Options_section` node is appended either way.
    fn consume_options(&mut self) -> Result<(), ParseError> {
        let root = self.ast.root().expect("root exists during parse");
        let section = self.ast.add_child(root, NodeKind::OptionsSection, None);
        self.options_node = Some(section);

        let Some(token) = self.current_token.clone() else {
            return Ok(());
        };
        if token.kind != TokenKind::Section || !token.value.eq_ignore_ascii_case("options:") {
            return Ok(());
        }

        self.change_lexer_state(states::STATE_OPTIONS)?;
        self.ast.add_child(section, NodeKind::SectionName, Some(token));
        self.current_node = Some(section);

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            if token.kind == TokenKind::Eof {
                return Ok(());
            }
            if token.kind == TokenKind::Newline && self.next_is(TokenKind::Newline) {
                self.next_token();
                return Ok(());
            }

            match token.kind {
                TokenKind::Section => return Ok(()),
                TokenKind::LongBlank => {
                    if self.next_is(TokenKind::Short) || self.next_is(TokenKind::Long) {
                        self.consume_option_line()?;
                    }
                    continue;
                }
                TokenKind::Newline | TokenKind::Blank => continue,
                _ => {
                    self.ast
                        .add_child(section, NodeKind::OptionsNode, Some(token));
                }
            }
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// One option definition: aliases, argument, then the description
    /// after the first `LONG_BLANK`.
    fn consume_option_line(&mut self) -> Result<(), ParseError> {
        let saved_node = self.current_node;
        let line = self
            .ast
            .add_child(self.current_node_id(), NodeKind::OptionLine, None);
        self.current_node = Some(line);

        let mut result = Ok(());
        'line: while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            match token.kind {
                TokenKind::Eof | TokenKind::Newline => {
                    if self.ast.children(line).is_empty() {
                        result = Err(ParseError::EmptyOptionLine { token });
                    }
                    break 'line;
                }
                TokenKind::LongBlank => {
                    // the description hangs off the line, not the alias group
                    if self.current_kind() == NodeKind::OptionAlternativeGroup {
                        self.current_node = Some(line);
                    }
                    result = self.consume_option_description();
                    break 'line;
                }
                TokenKind::Short => self.add_to_current(NodeKind::OptionShort, token),
                TokenKind::Long => self.add_to_current(NodeKind::OptionLong, token),
                TokenKind::Argument => {
                    if let Err(e) = self.consume_assign(Some(token)) {
                        result = Err(e);
                        break 'line;
                    }
                }
                TokenKind::Blank => continue,
                TokenKind::Punct => match token.value.as_str() {
                    "," => {
                        if let Err(e) = self.consume_option_alternative(&token) {
                            result = Err(e);
                            break 'line;
                        }
                    }
                    "=" => {
                        let next = self.next_token.clone();
                        if let Err(e) = self.consume_assign(next) {
                            result = Err(e);
                            break 'line;
                        }
                        // consume the assigned ARGUMENT
                        self.next_token();
                    }
                    _ => {
                        result = Err(ParseError::UnexpectedToken {
                            node: self.current_kind(),
                            token,
                        });
                        break 'line;
                    }
                },
                _ => {
                    result = Err(ParseError::UnexpectedToken {
                        node: NodeKind::OptionLine,
                        token,
                    });
                    break 'line;
                }
            }
        }

        if self.run {
            self.current_node = saved_node;
            result
        } else {
            Err(ParseError::Stopped {
                node: self.current_kind(),
            })
        }
    }

    /// On the first `,`, promote the aliases collected so far into an
    /// `Option_alternative_group`; later aliases accumulate inside it.
    fn consume_option_alternative(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.current_kind() == NodeKind::OptionAlternativeGroup {
            return Ok(());
        }
        let line = self.current_node_id();
        if self.ast.children(line).is_empty() {
            return Err(ParseError::EmptyAlternative {
                node: self.ast.kind(line),
                token: token.clone(),
            });
        }
        let group = self
            .ast
            .replace_children_with_group(line, NodeKind::OptionAlternativeGroup);
        self.current_node = Some(group);
        Ok(())
    }

    /// Accumulate description tokens until a blank line, EOF, or the
    /// start of the next option definition (whose `LONG_BLANK` is pushed
    /// back for the options loop to re-read).
    fn consume_option_description(&mut self) -> Result<(), ParseError> {
        let line = self.current_node_id();
        let description = self
            .ast
            .add_child(line, NodeKind::OptionDescription, None);
        let mut current_line = 0usize;

        while self.run {
            self.next_token();
            let Some(token) = self.current_token.clone() else {
                break;
            };

            match token.kind {
                TokenKind::Newline => {
                    current_line += 1;
                    if self.next_is(TokenKind::Newline) {
                        self.ast
                            .add_child(description, NodeKind::DescriptionNode, Some(token));
                        self.next_token();
                        return Ok(());
                    }
                    // a single NEWLINE belongs to the description
                }
                TokenKind::Eof => return Ok(()),
                TokenKind::LongBlank => {
                    if current_line > 0
                        && (self.next_is(TokenKind::Short) || self.next_is(TokenKind::Long))
                    {
                        self.reject_current_token();
                        return Ok(());
                    }
                    // LONG_BLANK inside the description body
                }
                TokenKind::Blank => continue,
                TokenKind::Default => return self.consume_option_default(line, token),
                _ => {}
            }

            self.ast
                .add_child(description, NodeKind::DescriptionNode, Some(token));
        }

        Err(ParseError::Stopped {
            node: self.current_kind(),
        })
    }

    /// A `[default: VALUE]` token ends the description. With the
    /// `option-default` feature it is attached to the owning option
    /// line; otherwise it is recognized and dropped.
    #[cfg(feature = "option-default")]
    fn consume_option_default(
        &mut self,
        line: NodeId,
        token: Token,
    ) -> Result<(), ParseError> {
        self.ast.add_child(line, NodeKind::OptionDefault, Some(token));
        Ok(())
    }

    #[cfg(not(feature = "option-default"))]
    fn consume_option_default(
        &mut self,
        _line: NodeId,
        _token: Token,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    /// Mark the last child of the current node repeatable.
    fn consume_ellipsis(&mut self, token: &Token) -> Result<(), ParseError> {
        let current = self.current_node_id();
        match self.ast.children(current).last().copied() {
            Some(last) => {
                self.ast.set_repeat(last, true);
                Ok(())
            }
            None => Err(ParseError::RepeatWithoutChild {
                node: self.ast.kind(current),
                token: token.clone(),
            }),
        }
    }

    /// Attach `argument` under the last child of the current node:
    /// `Usage_argument` for a long usage option, `Option_argument` for
    /// an option-line alias, an error for anything else.
    fn consume_assign(&mut self, argument: Option<Token>) -> Result<(), ParseError> {
        let current = self.current_node_id();
        let argument = match argument {
            Some(t) if t.kind == TokenKind::Argument => t,
            Some(t) => {
                return Err(ParseError::AssignExpectsArgument {
                    node: self.ast.kind(current),
                    token: t,
                })
            }
            None => {
                return Err(ParseError::AssignExpectsArgument {
                    node: self.ast.kind(current),
                    token: self
                        .current_token
                        .clone()
                        .unwrap_or_else(|| Token {
                            kind: TokenKind::Eof,
                            value: String::new(),
                            pos: crate::lexing::Position::new(0, 0, 0),
                            state: states::STATE_USAGE_LINE,
                        }),
                })
            }
        };

        let Some(last) = self.ast.children(current).last().copied() else {
            return Err(ParseError::AssignWithoutChild { token: argument });
        };
        let kind = match self.ast.kind(last) {
            NodeKind::UsageLongOption => NodeKind::UsageArgument,
            NodeKind::OptionLong | NodeKind::OptionShort => NodeKind::OptionArgument,
            other => {
                return Err(ParseError::AssignTarget {
                    target: other,
                    token: argument,
                })
            }
        };
        self.ast.add_child(last, kind, Some(argument));
        Ok(())
    }

    /// Closer expected by the group enclosing the current expression.
    fn enclosing_group_closer(&self) -> char {
        let parent = self
            .current_node
            .and_then(|id| self.ast.parent(id))
            .map(|id| self.ast.kind(id));
        match parent {
            Some(NodeKind::UsageRequiredGroup) => ')',
            _ => ']',
        }
    }

    /// Recurse into a bracketed group, then check the loop gave the
    /// expression context back.
    fn enter_group(&mut self, kind: NodeKind) -> Result<Reason, ParseError> {
        self.ensure_node(NodeKind::UsageExpr);
        self.consume_loop(kind)?;
        if self.current_kind() != NodeKind::UsageExpr {
            let error = ParseError::LoopContract {
                node: self.current_kind(),
            };
            self.fatal(error.clone());
            return Err(error);
        }
        Ok(Reason::Continue)
    }

    /// The `|` transform: outside any group, everything after
    /// `Prog_name` moves into a fresh required group; inside a group, a
    /// sibling expression opens.
    fn alternative_surgery(&mut self, token: &Token) -> Result<Reason, ParseError> {
        let current = self.current_node_id();
        if self.ast.kind(current) != NodeKind::UsageExpr {
            return Err(ParseError::UnexpectedToken {
                node: self.ast.kind(current),
                token: token.clone(),
            });
        }
        let parent = self
            .ast
            .parent(current)
            .expect("usage expression has a parent");

        match self.ast.kind(parent) {
            NodeKind::UsageLine => {
                // everything but Prog_name moves under the new group
                let moved = self.ast.take_children_from(parent, 1);
                let wrapper = self.ast.add_child(parent, NodeKind::UsageExpr, None);
                let group = self
                    .ast
                    .add_child(wrapper, NodeKind::UsageRequiredGroup, None);
                self.ast.adopt_children(group, moved);
                self.current_node = Some(group);
                Ok(Reason::Continue)
            }
            NodeKind::UsageRequiredGroup => {
                let expr = self.ast.add_child(parent, NodeKind::UsageExpr, None);
                self.current_node = Some(expr);
                Ok(Reason::Continue)
            }
            other => Err(ParseError::UnexpectedParent {
                node: NodeKind::UsageExpr,
                parent: other,
                token: token.clone(),
            }),
        }
    }
}

// ----------------------------------------------------------------------
// Consume functions (dispatched through the consumer table)
// ----------------------------------------------------------------------

/// Map the current token to a child of the active `Usage_Expr`.
fn consume_usage_expr(p: &mut DocoptParser<'_>) -> Result<Reason, ParseError> {
    if p.reached_eof() {
        return Ok(Reason::EofReached);
    }
    if p.reached_two_newline(true) {
        return Ok(Reason::TwoNewline);
    }
    if p.reached_prog_name() {
        return Ok(Reason::ProgNameSequence);
    }

    let Some(token) = p.current_token.clone() else {
        return Ok(Reason::EofReached);
    };

    if p.line_start_mismatch() {
        return Err(ParseError::LineStartMismatch {
            expected: p.prog_name.clone(),
            token,
        });
    }

    let kind = match token.kind {
        TokenKind::Newline | TokenKind::LongBlank | TokenKind::Blank => {
            return Ok(Reason::Continue)
        }
        TokenKind::Usage => {
            return Err(ParseError::UsageMisplaced {
                node: p.current_kind(),
                token,
            })
        }
        TokenKind::Short => NodeKind::UsageShortOption,
        TokenKind::Long => NodeKind::UsageLongOption,
        TokenKind::Argument => NodeKind::UsageArgument,
        TokenKind::Ident => NodeKind::UsageCommand,
        TokenKind::Punct => match token.value.as_str() {
            "[" => return p.enter_group(NodeKind::UsageOptionalGroup),
            "(" => return p.enter_group(NodeKind::UsageRequiredGroup),
            "..." => {
                p.ensure_node(NodeKind::UsageExpr);
                p.consume_ellipsis(&token)?;
                return Ok(Reason::Continue);
            }
            "=" => {
                p.ensure_node(NodeKind::UsageExpr);
                let next = p.next_token.clone();
                p.consume_assign(next)?;
                // consume the assigned ARGUMENT
                p.next_token();
                return Ok(Reason::Continue);
            }
            "|" => return p.alternative_surgery(&token),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    node: p.current_kind(),
                    token,
                })
            }
        },
        _ => {
            return Err(ParseError::UnexpectedToken {
                node: p.current_kind(),
                token,
            })
        }
    };

    p.ensure_node(NodeKind::UsageExpr);
    p.add_to_current(kind, token);
    Ok(Reason::Continue)
}

/// Like the expression consumer, but closers exit and line boundaries
/// are errors. Runs inside the `Usage_Expr` created by the loop for the
/// enclosing group.
fn consume_group(p: &mut DocoptParser<'_>) -> Result<Reason, ParseError> {
    let Some(token) = p.current_token.clone() else {
        return Ok(Reason::EofReached);
    };

    let kind = match token.kind {
        TokenKind::Eof | TokenKind::ProgName => {
            return Err(ParseError::UnclosedGroup {
                node: p.current_kind(),
                closer: p.enclosing_group_closer(),
                token,
            })
        }
        TokenKind::Usage => {
            return Err(ParseError::UsageMisplaced {
                node: p.current_kind(),
                token,
            })
        }
        TokenKind::Newline => {
            if p.next_is(TokenKind::Newline) {
                return Err(ParseError::TwoNewlineInGroup {
                    node: p.current_kind(),
                    token,
                });
            }
            return Ok(Reason::Continue);
        }
        TokenKind::LongBlank | TokenKind::Blank => return Ok(Reason::Continue),
        // TODO: expand the [options] shorthand against the options map
        TokenKind::Ident => NodeKind::UsageCommand,
        TokenKind::Short => NodeKind::UsageShortOption,
        TokenKind::Long => NodeKind::UsageLongOption,
        TokenKind::Argument => NodeKind::UsageArgument,
        TokenKind::Punct => match token.value.as_str() {
            "[" => {
                p.consume_loop(NodeKind::UsageOptionalGroup)?;
                return Ok(Reason::Continue);
            }
            "(" => {
                p.consume_loop(NodeKind::UsageRequiredGroup)?;
                return Ok(Reason::Continue);
            }
            "|" => {
                let parent = p
                    .current_node
                    .and_then(|id| p.ast.parent(id))
                    .expect("group expression has a parent");
                match p.ast.kind(parent) {
                    NodeKind::UsageOptionalGroup | NodeKind::UsageRequiredGroup => {
                        let expr = p.ast.add_child(parent, NodeKind::UsageExpr, None);
                        p.current_node = Some(expr);
                        return Ok(Reason::Continue);
                    }
                    other => {
                        return Err(ParseError::UnexpectedParent {
                            node: p.current_kind(),
                            parent: other,
                            token,
                        })
                    }
                }
            }
            "]" => {
                let parent = p.current_node.and_then(|id| p.ast.parent(id));
                if parent.map(|id| p.ast.kind(id)) == Some(NodeKind::UsageOptionalGroup) {
                    return Ok(Reason::EndOfGroup);
                }
                return Err(ParseError::MismatchedCloser {
                    node: p.current_kind(),
                    token,
                });
            }
            ")" => {
                let parent = p.current_node.and_then(|id| p.ast.parent(id));
                if parent.map(|id| p.ast.kind(id)) == Some(NodeKind::UsageRequiredGroup) {
                    return Ok(Reason::EndOfGroup);
                }
                return Err(ParseError::MismatchedCloser {
                    node: p.current_kind(),
                    token,
                });
            }
            "=" => {
                let next = p.next_token.clone();
                p.consume_assign(next)?;
                // consume the assigned ARGUMENT
                p.next_token();
                return Ok(Reason::Continue);
            }
            "..." => {
                p.consume_ellipsis(&token)?;
                return Ok(Reason::Continue);
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    node: p.current_kind(),
                    token,
                })
            }
        },
        _ => {
            return Err(ParseError::UnexpectedToken {
                node: p.current_kind(),
                token,
            })
        }
    };

    p.add_to_current(kind, token);
    Ok(Reason::Continue)
}
