//! Abstract Syntax Tree for Terra.
//!
//! Nodes are stored in an [`AstArena`] and refer to each other through
//! [`NodeId`] handles; child sequences are arena-tracked lists
//! ([`ListId`]).

use serde::{Deserialize, Serialize};

use crate::arena::{AstArena, ListId, NodeId};
use crate::intern::{Interner, Name};
use crate::scope::{ScopeId, ScopeTable, SymbolId};
use crate::span::Span;

/// A node record: payload plus source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Root: top-level function declarations in source order.
    Program { functions: ListId },
    FunctionDecl(FunctionDecl),
    /// `i32: a, b` inside a parameter list.
    ParamGroup(TypedNames),
    Block(Block),
    /// `var i32: x, y`
    VarDecl(TypedNames),
    /// `x: i32 = value`
    ShortDecl(ShortDecl),
    Return { values: ListId },
    Assign(Assign),
    Call(Call),
    Binary(Binary),
    Identifier(Identifier),
    IntegerLiteral(i64),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::FunctionDecl(_) => "FunctionDecl",
            NodeKind::ParamGroup(_) => "ParamGroup",
            NodeKind::Block(_) => "Block",
            NodeKind::VarDecl(_) => "VarDecl",
            NodeKind::ShortDecl(_) => "ShortDecl",
            NodeKind::Return { .. } => "Return",
            NodeKind::Assign(_) => "Assign",
            NodeKind::Call(_) => "Call",
            NodeKind::Binary(_) => "Binary",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::IntegerLiteral(_) => "IntegerLiteral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Identifier node naming the function.
    pub name: NodeId,
    /// `ParamGroup` nodes.
    pub params: ListId,
    /// Identifier nodes naming the return types.
    pub return_types: ListId,
    /// `None` only while the declaration is being parsed.
    pub body: Option<NodeId>,
    /// Scope holding the parameters.
    pub scope: ScopeId,
}

/// A type shared by one or more declared names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedNames {
    pub ty: NodeId,
    pub names: ListId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: ListId,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortDecl {
    pub name: NodeId,
    pub ty: NodeId,
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub targets: ListId,
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: NodeId,
    pub args: ListId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: Name,
    /// Symbol the identifier resolved to, if any.
    pub symbol: Option<SymbolId>,
}

/// Output of a parse: the root node plus every table it refers to.
#[derive(Debug)]
pub struct Ast {
    pub root: NodeId,
    pub arena: AstArena,
    pub interner: Interner,
    pub scopes: ScopeTable,
    pub global_scope: ScopeId,
}

impl Ast {
    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn list(&self, list: ListId) -> &[NodeId] {
        self.arena.list(list)
    }

    /// Top-level function declarations.
    pub fn functions(&self) -> &[NodeId] {
        match self.node(self.root).kind {
            NodeKind::Program { functions } => self.list(functions),
            _ => &[],
        }
    }

    pub fn identifier(&self, id: NodeId) -> Option<&Identifier> {
        match &self.node(id).kind {
            NodeKind::Identifier(ident) => Some(ident),
            _ => None,
        }
    }

    /// Text of an identifier node, or of a function declaration's name.
    pub fn name_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Identifier(ident) => Some(self.interner.resolve(ident.name)),
            NodeKind::FunctionDecl(func) => self.name_text(func.name),
            _ => None,
        }
    }

    /// Direct children of a node, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        match &self.node(id).kind {
            NodeKind::Program { functions } => children.extend_from_slice(self.list(*functions)),
            NodeKind::FunctionDecl(func) => {
                children.push(func.name);
                children.extend_from_slice(self.list(func.params));
                children.extend_from_slice(self.list(func.return_types));
                children.extend(func.body);
            }
            NodeKind::ParamGroup(group) | NodeKind::VarDecl(group) => {
                children.push(group.ty);
                children.extend_from_slice(self.list(group.names));
            }
            NodeKind::Block(block) => children.extend_from_slice(self.list(block.statements)),
            NodeKind::ShortDecl(decl) => {
                children.push(decl.name);
                children.push(decl.ty);
                children.extend(decl.value);
            }
            NodeKind::Return { values } => children.extend_from_slice(self.list(*values)),
            NodeKind::Assign(assign) => {
                children.extend_from_slice(self.list(assign.targets));
                children.extend(assign.value);
            }
            NodeKind::Call(call) => {
                children.push(call.callee);
                children.extend_from_slice(self.list(call.args));
            }
            NodeKind::Binary(binary) => {
                children.push(binary.left);
                children.push(binary.right);
            }
            NodeKind::Identifier(_) | NodeKind::IntegerLiteral(_) => {}
        }
        children
    }

    /// Tear down the node arena in one pass. Node handles are dead afterwards.
    pub fn release(&mut self) {
        self.arena.release_all();
    }

    /// Every node reachable from the root, depth-first pre-order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        order
    }
}
