// Route handlers. Everything outside `public` sits behind the auth gate and
// performs exactly one repository call inside a scoped store client.
pub mod bookdata;
pub mod public;
pub mod userdata;
pub mod uuidmap;
