//! Access flags for classes, fields and methods.

use bitflags::bitflags;

bitflags! {
    /// Access and property flags of a class, field or method.
    ///
    /// The same bit can mean different things depending on what it is applied to; the
    /// aliases (`VOLATILE`/`BRIDGE`, `TRANSIENT`/`VARARGS`) share a value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only to the defining class
        const PRIVATE = 0x0002;
        /// Visible to the package and subclasses
        const PROTECTED = 0x0004;
        /// Not bound to an instance
        const STATIC = 0x0008;
        /// Not subclassable, overridable or reassignable
        const FINAL = 0x0010;
        /// Method acquires the monitor of its receiver or class
        const SYNCHRONIZED = 0x0020;
        /// Field access is not cached
        const VOLATILE = 0x0040;
        /// Compiler generated bridge method
        const BRIDGE = 0x0040;
        /// Field is not serialized
        const TRANSIENT = 0x0080;
        /// Last parameter is a rest argument
        const VARARGS = 0x0080;
        /// Method is implemented in native code
        const NATIVE = 0x0100;
        /// Class is an interface
        const INTERFACE = 0x0200;
        /// Class or method is not directly instantiable or callable
        const ABSTRACT = 0x0400;
        /// Strict floating point
        const STRICT = 0x0800;
        /// Not directly defined in source
        const SYNTHETIC = 0x1000;
        /// Class is an annotation type
        const ANNOTATION = 0x2000;
        /// Class or field is an enumeration
        const ENUM = 0x4000;
        /// Constructor or static initializer
        const CONSTRUCTOR = 0x1_0000;
        /// Method was declared `synchronized`
        const DECLARED_SYNCHRONIZED = 0x2_0000;
    }
}

impl AccessFlags {
    /// Returns `true` if a method with these flags is a direct method (static, private or
    /// constructor). Direct methods are listed before virtual methods in class data.
    #[must_use]
    pub fn is_direct_method(self) -> bool {
        self.intersects(AccessFlags::STATIC | AccessFlags::PRIVATE | AccessFlags::CONSTRUCTOR)
    }
}
