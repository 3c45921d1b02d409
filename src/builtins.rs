use crate::semantics::TypeKind;

/// I/O functions serviced by the VM directly rather than by a user label.
/// The analyzer predeclares them in the global scope with these signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    PrintInt,
    PrintDouble,
    PrintStr,
    InputInt,
    InputDouble,
    InputStr,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::PrintInt,
        Builtin::PrintDouble,
        Builtin::PrintStr,
        Builtin::InputInt,
        Builtin::InputDouble,
        Builtin::InputStr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::PrintInt => "printInt",
            Builtin::PrintDouble => "printDouble",
            Builtin::PrintStr => "printStr",
            Builtin::InputInt => "inputInt",
            Builtin::InputDouble => "inputDouble",
            Builtin::InputStr => "inputStr",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "printInt" => Some(Builtin::PrintInt),
            "printDouble" => Some(Builtin::PrintDouble),
            "printStr" => Some(Builtin::PrintStr),
            "inputInt" => Some(Builtin::InputInt),
            "inputDouble" => Some(Builtin::InputDouble),
            "inputStr" => Some(Builtin::InputStr),
            _ => None,
        }
    }

    pub fn return_type(self) -> TypeKind {
        match self {
            Builtin::PrintInt | Builtin::PrintDouble | Builtin::PrintStr => TypeKind::Void,
            Builtin::InputInt => TypeKind::Int,
            Builtin::InputDouble => TypeKind::Double,
            Builtin::InputStr => TypeKind::String,
        }
    }

    pub fn param_types(self) -> &'static [TypeKind] {
        match self {
            Builtin::PrintInt => &[TypeKind::Int],
            Builtin::PrintDouble => &[TypeKind::Double],
            Builtin::PrintStr => &[TypeKind::String],
            Builtin::InputInt | Builtin::InputDouble | Builtin::InputStr => &[],
        }
    }
}
