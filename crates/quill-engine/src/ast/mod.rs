//! Abstract Syntax Tree (AST) definitions.
//!
//! The shape follows ESTree where it is convenient. Statements carry the
//! line they start on so runtime errors can be attributed. Function
//! literals sit behind an `Rc` so closures share the body with the tree
//! instead of copying it.

use std::rc::Rc;

/// A node tagged with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The wrapped node
    pub node: T,
    /// Source line
    pub line: usize,
}

impl<T> Spanned<T> {
    /// Wraps `node` with `line`.
    pub fn new(node: T, line: usize) -> Self {
        Self { node, line }
    }
}

/// A statement with its source line.
pub type StatementNode = Spanned<Statement>;

/// A complete program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<StatementNode>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration; hoisted to the top of its block
    FunctionDeclaration(Rc<FunctionLiteral>),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(Vec<StatementNode>),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(WhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in statement over keys
    ForIn(ForEachStatement),
    /// For-of statement over values
    ForOf(ForEachStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Break statement with optional label
    Break(Option<String>),
    /// Continue statement with optional label
    Continue(Option<String>),
    /// Throw statement
    Throw(Expression),
    /// Try statement
    Try(TryStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The name being declared
    pub name: String,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<StatementNode>,
    /// The optional else branch
    pub alternate: Option<Box<StatementNode>>,
}

/// A while or do-while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The body
    pub body: Box<StatementNode>,
}

/// A classic three-clause for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Initializer
    pub init: Option<Box<StatementNode>>,
    /// Loop condition; absent means forever
    pub test: Option<Expression>,
    /// Update expression
    pub update: Option<Expression>,
    /// The body
    pub body: Box<StatementNode>,
}

/// A for-in or for-of statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStatement {
    /// Declaration keyword, if the loop declares its variable
    pub kind: Option<VariableKind>,
    /// The loop variable
    pub name: String,
    /// The iterated value
    pub right: Expression,
    /// The body
    pub body: Box<StatementNode>,
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant
    pub discriminant: Expression,
    /// The cases in source order
    pub cases: Vec<SwitchCase>,
}

/// A switch case; `test` is `None` for `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The case test
    pub test: Option<Expression>,
    /// The statements run on match
    pub consequent: Vec<StatementNode>,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The protected block
    pub block: Vec<StatementNode>,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<Vec<StatementNode>>,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The name bound to the caught value, if any
    pub param: Option<String>,
    /// The handler body
    pub body: Vec<StatementNode>,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    /// The label
    pub label: String,
    /// The labeled statement
    pub body: Box<StatementNode>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(String),
    /// `this`
    This,
    /// Template string
    Template(Vec<TemplatePart>),
    /// Array literal
    Array(Vec<Expression>),
    /// Object literal
    Object(Vec<ObjectMember>),
    /// Function or arrow literal
    Function(Rc<FunctionLiteral>),
    /// Unary operation
    Unary(UnaryExpression),
    /// Prefix or postfix `++`/`--`
    Update(UpdateExpression),
    /// Binary operation
    Binary(BinaryExpression),
    /// Short-circuit `&&`, `||`, `??`
    Logical(LogicalExpression),
    /// Assignment, plain or compound
    Assignment(AssignmentExpression),
    /// Ternary conditional
    Conditional(ConditionalExpression),
    /// Function call
    Call(CallExpression),
    /// Property access
    Member(MemberExpression),
    /// `new` expression
    New(NewExpression),
    /// Spread element in array literals and argument lists
    Spread(Box<Expression>),
    /// Comma-separated sequence
    Sequence(Vec<Expression>),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// undefined
    Undefined,
    /// null
    Null,
    /// true / false
    Boolean(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
}

/// One segment of a template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text
    Text(String),
    /// Interpolated expression
    Expression(Expression),
}

/// A member of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    /// `key: value`, shorthand `key`, or method `key() {}`
    Property(Property),
    /// `...source`
    Spread(Expression),
}

/// A property in an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The key
    pub key: PropertyKey,
    /// The value
    pub value: Expression,
}

/// A property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier, string or number key, already in string form
    Static(String),
    /// Computed key [expr]
    Computed(Box<Expression>),
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Bound name
    pub name: String,
    /// Default used when the argument is undefined
    pub default: Option<Expression>,
    /// `...name` collects the remaining arguments
    pub rest: bool,
}

/// A function body.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// Statement block
    Block(Vec<StatementNode>),
    /// Concise arrow body
    Expression(Box<Expression>),
}

/// A function declaration, expression, method or arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// Name, if the literal had one
    pub name: Option<String>,
    /// Parameters
    pub params: Vec<Param>,
    /// Body
    pub body: FunctionBody,
    /// Arrows capture `this` and `arguments` lexically
    pub is_arrow: bool,
    /// Line of the `function` keyword or arrow parameters
    pub line: usize,
}

impl FunctionLiteral {
    /// Number of parameters before the first default or rest parameter.
    pub fn arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.default.is_none() && !p.rest)
            .count()
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An update expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// Whether the operator precedes the operand
    pub prefix: bool,
    /// The target
    pub argument: Box<Expression>,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// **
    Exponent,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// <
    LessThan,
    /// <=
    LessThanEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanEqual,
    /// &
    BitwiseAnd,
    /// |
    BitwiseOr,
    /// ^
    BitwiseXor,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// in
    In,
    /// instanceof
    Instanceof,
}

/// A short-circuit expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    Nullish,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The target: identifier or member expression
    pub target: Box<Expression>,
    /// The assigned value
    pub value: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubtractAssign,
    /// *=
    MultiplyAssign,
    /// /=
    DivideAssign,
    /// %=
    ModuloAssign,
    /// **=
    ExponentAssign,
    /// <<=
    LeftShiftAssign,
    /// >>=
    RightShiftAssign,
    /// >>>=
    UnsignedRightShiftAssign,
    /// &=
    BitwiseAndAssign,
    /// |=
    BitwiseOrAssign,
    /// ^=
    BitwiseXorAssign,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, `None` for `=`.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        let op = match self {
            AssignmentOperator::Assign => return None,
            AssignmentOperator::AddAssign => BinaryOperator::Add,
            AssignmentOperator::SubtractAssign => BinaryOperator::Subtract,
            AssignmentOperator::MultiplyAssign => BinaryOperator::Multiply,
            AssignmentOperator::DivideAssign => BinaryOperator::Divide,
            AssignmentOperator::ModuloAssign => BinaryOperator::Modulo,
            AssignmentOperator::ExponentAssign => BinaryOperator::Exponent,
            AssignmentOperator::LeftShiftAssign => BinaryOperator::LeftShift,
            AssignmentOperator::RightShiftAssign => BinaryOperator::RightShift,
            AssignmentOperator::UnsignedRightShiftAssign => BinaryOperator::UnsignedRightShift,
            AssignmentOperator::BitwiseAndAssign => BinaryOperator::BitwiseAnd,
            AssignmentOperator::BitwiseOrAssign => BinaryOperator::BitwiseOr,
            AssignmentOperator::BitwiseXorAssign => BinaryOperator::BitwiseXor,
        };
        Some(op)
    }
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// Value when truthy
    pub consequent: Box<Expression>,
    /// Value when falsy
    pub alternate: Box<Expression>,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub callee: Box<Expression>,
    /// The arguments, possibly including spreads
    pub arguments: Vec<Expression>,
    /// `f?.()`
    pub optional: bool,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
    /// `a?.b`
    pub optional: bool,
}

/// The property part of a member expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// a.b
    Identifier(String),
    /// a[expr]
    Computed(Box<Expression>),
}

/// A `new` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    /// The constructor
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, default: Option<Expression>, rest: bool) -> Param {
        Param {
            name: name.to_string(),
            default,
            rest,
        }
    }

    #[test]
    fn test_arity_stops_at_default_and_rest() {
        let func = FunctionLiteral {
            name: None,
            params: vec![
                param("a", None, false),
                param("b", Some(Expression::Literal(Literal::Number(1.0))), false),
                param("c", None, true),
            ],
            body: FunctionBody::Block(Vec::new()),
            is_arrow: false,
            line: 1,
        };
        assert_eq!(func.arity(), 1);
    }

    #[test]
    fn test_compound_assignment_operator() {
        assert_eq!(AssignmentOperator::Assign.binary_operator(), None);
        assert_eq!(
            AssignmentOperator::UnsignedRightShiftAssign.binary_operator(),
            Some(BinaryOperator::UnsignedRightShift)
        );
    }
}
