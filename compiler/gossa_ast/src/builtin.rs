//! Callees the core implements natively.

use std::fmt;

/// Go's predeclared functions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Builtin {
    Len,
    Cap,
    Append,
    Copy,
    Delete,
    /// `make(T, args...)`: the call's type is `T`.
    Make,
    /// `new(T)`: the call's type is `*T`.
    New,
    Close,
    Panic,
    Recover,
    Print,
    Println,
    Min,
    Max,
    Clear,
    Complex,
    Real,
    Imag,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Cap => "cap",
            Builtin::Append => "append",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Make => "make",
            Builtin::New => "new",
            Builtin::Close => "close",
            Builtin::Panic => "panic",
            Builtin::Recover => "recover",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Clear => "clear",
            Builtin::Complex => "complex",
            Builtin::Real => "real",
            Builtin::Imag => "imag",
        }
    }

    /// Never returns normally.
    pub fn is_no_return(self) -> bool {
        matches!(self, Builtin::Panic)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Library functions the front end maps onto native implementations.
///
/// Methods (`sync.Mutex.Lock`, `reflect.Value.Int`, ...) take their receiver
/// as the first argument.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Intrinsic {
    FmtPrint,
    FmtPrintln,
    FmtPrintf,
    FmtSprint,
    FmtSprintln,
    FmtSprintf,
    FmtErrorf,
    ErrorsNew,
    OsExit,
    RuntimeGosched,
    /// `*sync.Mutex` receiver.
    MutexLock,
    MutexUnlock,
    /// `*sync.WaitGroup` receiver.
    WaitGroupAdd,
    WaitGroupDone,
    WaitGroupWait,

    ReflectTypeOf,
    ReflectValueOf,
    TypeKind,
    TypeElem,
    TypeKey,
    TypeLen,
    TypeNumField,
    /// `t.Field(i).Name`
    TypeFieldName,
    TypeString,
    TypeName,
    ValueKind,
    ValueType,
    ValueElem,
    ValueField,
    ValueNumField,
    ValueIndex,
    ValueLen,
    ValueInt,
    ValueUint,
    ValueFloat,
    ValueBool,
    ValueString,
    ValuePointer,
    ValueIsNil,
    ValueIsValid,
    ValueInterface,
}

impl Intrinsic {
    /// Qualified Go name.
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::FmtPrint => "fmt.Print",
            Intrinsic::FmtPrintln => "fmt.Println",
            Intrinsic::FmtPrintf => "fmt.Printf",
            Intrinsic::FmtSprint => "fmt.Sprint",
            Intrinsic::FmtSprintln => "fmt.Sprintln",
            Intrinsic::FmtSprintf => "fmt.Sprintf",
            Intrinsic::FmtErrorf => "fmt.Errorf",
            Intrinsic::ErrorsNew => "errors.New",
            Intrinsic::OsExit => "os.Exit",
            Intrinsic::RuntimeGosched => "runtime.Gosched",
            Intrinsic::MutexLock => "(*sync.Mutex).Lock",
            Intrinsic::MutexUnlock => "(*sync.Mutex).Unlock",
            Intrinsic::WaitGroupAdd => "(*sync.WaitGroup).Add",
            Intrinsic::WaitGroupDone => "(*sync.WaitGroup).Done",
            Intrinsic::WaitGroupWait => "(*sync.WaitGroup).Wait",
            Intrinsic::ReflectTypeOf => "reflect.TypeOf",
            Intrinsic::ReflectValueOf => "reflect.ValueOf",
            Intrinsic::TypeKind => "reflect.Type.Kind",
            Intrinsic::TypeElem => "reflect.Type.Elem",
            Intrinsic::TypeKey => "reflect.Type.Key",
            Intrinsic::TypeLen => "reflect.Type.Len",
            Intrinsic::TypeNumField => "reflect.Type.NumField",
            Intrinsic::TypeFieldName => "reflect.Type.Field.Name",
            Intrinsic::TypeString => "reflect.Type.String",
            Intrinsic::TypeName => "reflect.Type.Name",
            Intrinsic::ValueKind => "reflect.Value.Kind",
            Intrinsic::ValueType => "reflect.Value.Type",
            Intrinsic::ValueElem => "reflect.Value.Elem",
            Intrinsic::ValueField => "reflect.Value.Field",
            Intrinsic::ValueNumField => "reflect.Value.NumField",
            Intrinsic::ValueIndex => "reflect.Value.Index",
            Intrinsic::ValueLen => "reflect.Value.Len",
            Intrinsic::ValueInt => "reflect.Value.Int",
            Intrinsic::ValueUint => "reflect.Value.Uint",
            Intrinsic::ValueFloat => "reflect.Value.Float",
            Intrinsic::ValueBool => "reflect.Value.Bool",
            Intrinsic::ValueString => "reflect.Value.String",
            Intrinsic::ValuePointer => "reflect.Value.Pointer",
            Intrinsic::ValueIsNil => "reflect.Value.IsNil",
            Intrinsic::ValueIsValid => "reflect.Value.IsValid",
            Intrinsic::ValueInterface => "reflect.Value.Interface",
        }
    }

    /// Never returns normally.
    pub fn is_no_return(self) -> bool {
        matches!(self, Intrinsic::OsExit)
    }

    /// May suspend the calling goroutine.
    pub fn may_block(self) -> bool {
        matches!(
            self,
            Intrinsic::RuntimeGosched | Intrinsic::MutexLock | Intrinsic::WaitGroupWait
        )
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
