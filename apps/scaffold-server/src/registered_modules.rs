// Keeps every endpoint-unit crate linked so its inventory registration
// actually runs. Maintained by hand; new units get a line here.
#![allow(unused_imports)]

use catalog as _;
use health as _;
use qr_generator as _;
use resources as _;
use users as _;
